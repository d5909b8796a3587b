use crate::api::AccountApi;
use crate::models::{SeriesId, SeriesMetadata, SeriesRating};
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::warn;

/// In-memory mirror of the server-held watch/rating/tracking state. Owns
/// every rating for the session; mutated optimistically before the network
/// confirms anything.
pub struct RatingStore {
    ratings: HashMap<SeriesId, SeriesRating>,
    order: Vec<SeriesId>,
}

impl RatingStore {
    pub async fn load(api: &dyn AccountApi) -> Result<Self> {
        let ratings = api
            .fetch_ratings()
            .await
            .context("loading account ratings")?;
        let order = ratings.keys().copied().collect();
        Ok(Self { ratings, order })
    }

    pub fn list(&self) -> impl Iterator<Item = &SeriesRating> {
        self.order.iter().filter_map(|id| self.ratings.get(id))
    }

    pub fn get(&self, series: SeriesId) -> Option<&SeriesRating> {
        self.ratings.get(&series)
    }

    pub fn get_mut(&mut self, series: SeriesId) -> Option<&mut SeriesRating> {
        self.ratings.get_mut(&series)
    }

    pub fn contains(&self, series: SeriesId) -> bool {
        self.ratings.contains_key(&series)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Stable in-place sort by name, case-insensitive, ignoring a single
    /// leading "The ". Ties keep their previous relative order.
    pub fn sort_alphabetical(&mut self) {
        let ratings = &self.ratings;
        self.order.sort_by(|a, b| {
            let ka = ratings.get(a).map(|r| sort_key(&r.name)).unwrap_or_default();
            let kb = ratings.get(b).map(|r| sort_key(&r.name)).unwrap_or_default();
            ka.cmp(&kb)
        });
    }

    /// Fills in zero-value season/episode ratings for metadata entries this
    /// store has never seen. Existing entries are never removed or
    /// overwritten, so calling this repeatedly is a no-op after the first.
    pub fn reconcile(&mut self, metadata: &SeriesMetadata) {
        let Some(rating) = self.ratings.get_mut(&metadata.id) else {
            warn!(series = metadata.id, "reconcile for a series not in the store");
            return;
        };
        for (&season_num, season_meta) in &metadata.seasons {
            let season = rating.seasons.entry(season_num).or_default();
            for &episode_num in season_meta.episodes.keys() {
                season.episodes.entry(episode_num).or_default();
            }
        }
    }

    /// Caller must check `contains` first; inserting an id that is already
    /// tracked is a precondition violation and is not guarded here.
    pub fn add_series(&mut self, series: SeriesId, name: &str) -> &mut SeriesRating {
        self.order.push(series);
        self.ratings
            .entry(series)
            .or_insert_with(|| SeriesRating::new(series, name))
    }

    /// First series whose name matches `query` at a word start,
    /// case-insensitive. Empty queries match nothing.
    pub fn search(&self, query: &str) -> Option<&SeriesRating> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        self.list().find(|r| name_matches(&r.name, &query))
    }
}

fn sort_key(name: &str) -> String {
    let trimmed = name.trim();
    // byte-boundary safe: get() fails inside a multibyte character
    let rest = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("the ") => &trimmed[4..],
        _ => trimmed,
    };
    rest.to_lowercase()
}

fn name_matches(name: &str, query_lower: &str) -> bool {
    let name = name.to_lowercase();
    if name.starts_with(query_lower) {
        return true;
    }
    name.char_indices()
        .any(|(i, c)| !c.is_alphanumeric() && name[i + c.len_utf8()..].starts_with(query_lower))
}
