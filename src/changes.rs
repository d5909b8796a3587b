use crate::api::AccountApi;
use crate::models::SeriesId;
use crate::sync::SyncSignal;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Sparse mirror of the rating tree holding only the fields edited since the
/// last flush. Serializes to the `POST /account/rating` body: series id ->
/// changed fields, with untouched fields and empty sub-maps left out entirely.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    series: BTreeMap<SeriesId, SeriesChange>,
}

#[derive(Debug, Default, Serialize)]
pub struct SeriesChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub seasons: BTreeMap<u32, SeasonChange>,
}

#[derive(Debug, Default, Serialize)]
pub struct SeasonChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub episodes: BTreeMap<u32, EpisodeChange>,
}

#[derive(Debug, Default, Serialize)]
pub struct EpisodeChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl ChangeSet {
    pub fn series_mut(&mut self, series: SeriesId) -> &mut SeriesChange {
        self.series.entry(series).or_default()
    }

    pub fn season_mut(&mut self, series: SeriesId, season: u32) -> &mut SeasonChange {
        self.series_mut(series).seasons.entry(season).or_default()
    }

    pub fn episode_mut(&mut self, series: SeriesId, season: u32, episode: u32) -> &mut EpisodeChange {
        self.season_mut(series, season)
            .episodes
            .entry(episode)
            .or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn take(&mut self) -> ChangeSet {
        std::mem::take(self)
    }
}

/// Accumulates pending edits and ships them to the account store. Every
/// recording call restarts the sync debounce; `flush` swaps the tree for an
/// empty one before the network call so edits arriving mid-flight land in a
/// fresh tree.
pub struct ChangeLog {
    pending: Mutex<ChangeSet>,
    api: Arc<dyn AccountApi>,
    signal_tx: mpsc::UnboundedSender<SyncSignal>,
}

impl ChangeLog {
    pub fn new(api: Arc<dyn AccountApi>, signal_tx: mpsc::UnboundedSender<SyncSignal>) -> Self {
        Self {
            pending: Mutex::new(ChangeSet::default()),
            api,
            signal_tx,
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, ChangeSet> {
        self.pending.lock().expect("pending change tree lock poisoned")
    }

    fn touch(&self) {
        // Send failure means the scheduler is already stopped; the shutdown
        // flush will pick the edit up.
        let _ = self.signal_tx.send(SyncSignal::Touch);
    }

    pub fn record_series_added(&self, series: SeriesId, name: &str) {
        self.lock_pending().series_mut(series).name = Some(name.to_string());
        self.touch();
    }

    pub fn record_tracking(&self, series: SeriesId, tracking: bool) {
        self.lock_pending().series_mut(series).tracking = Some(tracking);
        self.touch();
    }

    pub fn record_series_rating(&self, series: SeriesId, rating: u8) {
        self.lock_pending().series_mut(series).rating = Some(rating);
        self.touch();
    }

    pub fn record_season_rating(&self, series: SeriesId, season: u32, rating: u8) {
        self.lock_pending().season_mut(series, season).rating = Some(rating);
        self.touch();
    }

    pub fn record_episode_watched(&self, series: SeriesId, season: u32, episode: u32, watched: bool) {
        self.lock_pending().episode_mut(series, season, episode).watched = Some(watched);
        self.touch();
    }

    /// A non-zero rating on an unwatched episode also marks it watched; both
    /// fields land in the same change record so a single flush carries them.
    pub fn record_episode_rating(
        &self,
        series: SeriesId,
        season: u32,
        episode: u32,
        rating: u8,
        mark_watched: bool,
    ) {
        {
            let mut pending = self.lock_pending();
            let change = pending.episode_mut(series, season, episode);
            change.rating = Some(rating);
            if mark_watched {
                change.watched = Some(true);
            }
        }
        self.touch();
    }

    /// Takes the current tree and pushes it in one request. Best effort: a
    /// failed push is reported to the caller for logging but the edits are
    /// gone either way, there is no retry.
    pub async fn flush(&self) -> Result<()> {
        let snapshot = self.lock_pending().take();
        if snapshot.is_empty() {
            debug!("no changes to sync");
            return Ok(());
        }

        debug!(series = snapshot.len(), "syncing changes");
        self.api.push_changes(&snapshot).await?;
        info!(series = snapshot.len(), "changes synced");
        Ok(())
    }
}
