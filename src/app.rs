use crate::api::AccountApi;
use crate::changes::ChangeLog;
use crate::models::{has_aired, SeriesId, SeriesMetadata, SeriesRating};
use crate::ratings::RatingStore;
use crate::sync::{SyncScheduler, SYNC_DEBOUNCE};
use crate::tmdb::{SearchApi, SearchPage};
use crate::view::{self, SeriesSummary};
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Tracked series with something left to watch.
    Watchlist,
    All,
}

/// A user edit, dispatched by whatever renders the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Tracking { series: SeriesId, tracking: bool },
    SeriesRating { series: SeriesId, rating: u8 },
    SeasonRating { series: SeriesId, season: u32, rating: u8 },
    SeasonWatched { series: SeriesId, season: u32, watched: bool },
    EpisodeWatched { series: SeriesId, season: u32, episode: u32, watched: bool },
    EpisodeRating { series: SeriesId, season: u32, episode: u32, rating: u8 },
}

/// Session-scoped context tying the store, the pending change log and the
/// sync scheduler together. Edits apply to the store immediately and queue
/// in the change log; the network catches up on its own schedule.
pub struct Session {
    store: RatingStore,
    metadata: HashMap<SeriesId, SeriesMetadata>,
    summaries: HashMap<SeriesId, SeriesSummary>,
    changes: Arc<ChangeLog>,
    scheduler: SyncScheduler,
    api: Arc<dyn AccountApi>,
    search: Arc<dyn SearchApi>,
    today: NaiveDate,
    pub mode: ViewMode,
}

impl Session {
    pub async fn start(api: Arc<dyn AccountApi>, search: Arc<dyn SearchApi>) -> Result<Self> {
        Self::start_at(api, search, Local::now().date_naive(), SYNC_DEBOUNCE).await
    }

    /// `today` is captured once so aired/unaired answers stay stable for the
    /// whole session.
    pub async fn start_at(
        api: Arc<dyn AccountApi>,
        search: Arc<dyn SearchApi>,
        today: NaiveDate,
        debounce: Duration,
    ) -> Result<Self> {
        let mut store = RatingStore::load(api.as_ref()).await?;
        store.sort_alphabetical();
        info!(series = store.len(), "session started");

        let (changes, scheduler) = SyncScheduler::spawn(api.clone(), debounce);
        Ok(Self {
            store,
            metadata: HashMap::new(),
            summaries: HashMap::new(),
            changes,
            scheduler,
            api,
            search,
            today,
            mode: ViewMode::Watchlist,
        })
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn summary(&self, series: SeriesId) -> Option<SeriesSummary> {
        self.summaries.get(&series).copied()
    }

    pub fn season_watched(&self, series: SeriesId, season: u32) -> bool {
        let Some(season_meta) = self
            .metadata
            .get(&series)
            .and_then(|m| m.seasons.get(&season))
        else {
            return false;
        };
        self.store
            .get(series)
            .and_then(|r| r.seasons.get(&season))
            .map(|s| view::season_watched(season_meta, s))
            .unwrap_or(false)
    }

    /// Series the current view mode shows, in listing order. A series whose
    /// metadata has not loaded yet stays visible on the watchlist.
    pub fn visible_series(&self) -> Vec<&SeriesRating> {
        self.store
            .list()
            .filter(|r| match self.mode {
                ViewMode::All => true,
                ViewMode::Watchlist => {
                    r.tracking
                        && !self
                            .summaries
                            .get(&r.id)
                            .map(|s| s.seen_all())
                            .unwrap_or(false)
                }
            })
            .collect()
    }

    /// Navbar lookup over already-tracked series.
    pub fn search_tracked(&self, query: &str) -> Option<&SeriesRating> {
        self.store.search(query)
    }

    /// Remote provider search; posterless results are already filtered out.
    pub async fn search_remote(&self, query: &str, page: u32) -> Result<SearchPage> {
        self.search.search_tv(query, page).await
    }

    /// Fetches metadata (cached for the session), reconciles the rating tree
    /// against it and computes the series aggregates.
    pub async fn open_series(&mut self, series: SeriesId) -> Result<&SeriesMetadata> {
        if !self.metadata.contains_key(&series) {
            let metadata = self
                .api
                .fetch_series(series)
                .await
                .with_context(|| format!("loading series {series}"))?;
            self.store.reconcile(&metadata);
            self.metadata.insert(series, metadata);
        }
        self.recompute(series);
        self.metadata
            .get(&series)
            .ok_or_else(|| anyhow!("series {series} metadata missing after load"))
    }

    /// Adds a series picked from remote search results. Returns false when
    /// the series is already tracked (the duplicate stays untouched).
    pub async fn add_series(&mut self, series: SeriesId, name: &str) -> Result<bool> {
        if self.store.contains(series) {
            warn!(series, "series already tracked");
            return Ok(false);
        }

        // the server learns the name from the change payload
        self.changes.record_series_added(series, name);
        self.api
            .ingest_series(series)
            .await
            .context("registering series with the account store")?;

        self.store.add_series(series, name);
        self.store.sort_alphabetical();
        info!(series, name, "series added");

        self.open_series(series).await?;
        Ok(true)
    }

    pub fn apply(&mut self, edit: Edit) {
        match edit {
            Edit::Tracking { series, tracking } => {
                let Some(rating) = self.store.get_mut(series) else {
                    warn!(series, "tracking edit for unknown series");
                    return;
                };
                rating.tracking = tracking;
                self.changes.record_tracking(series, tracking);
            }
            Edit::SeriesRating { series, rating } => {
                let Some(series_rating) = self.store.get_mut(series) else {
                    warn!(series, "rating edit for unknown series");
                    return;
                };
                series_rating.rating = rating;
                self.changes.record_series_rating(series, rating);
            }
            Edit::SeasonRating { series, season, rating } => {
                let Some(season_rating) = self
                    .store
                    .get_mut(series)
                    .and_then(|r| r.seasons.get_mut(&season))
                else {
                    warn!(series, season, "rating edit for unknown season");
                    return;
                };
                season_rating.rating = rating;
                self.changes.record_season_rating(series, season, rating);
            }
            Edit::SeasonWatched { series, season, watched } => {
                self.toggle_season(series, season, watched);
                self.recompute(series);
            }
            Edit::EpisodeWatched { series, season, episode, watched } => {
                let Some(episode_rating) = self
                    .store
                    .get_mut(series)
                    .and_then(|r| r.seasons.get_mut(&season))
                    .and_then(|s| s.episodes.get_mut(&episode))
                else {
                    warn!(series, season, episode, "watched edit for unknown episode");
                    return;
                };
                episode_rating.watched = watched;
                self.changes
                    .record_episode_watched(series, season, episode, watched);
                self.recompute(series);
            }
            Edit::EpisodeRating { series, season, episode, rating } => {
                let Some(episode_rating) = self
                    .store
                    .get_mut(series)
                    .and_then(|r| r.seasons.get_mut(&season))
                    .and_then(|s| s.episodes.get_mut(&episode))
                else {
                    warn!(series, season, episode, "rating edit for unknown episode");
                    return;
                };
                episode_rating.rating = rating;
                // any non-zero rating marks the episode watched, in the same
                // change record
                let mark_watched = rating != 0 && !episode_rating.watched;
                if mark_watched {
                    episode_rating.watched = true;
                }
                self.changes
                    .record_episode_rating(series, season, episode, rating, mark_watched);
                if mark_watched {
                    self.recompute(series);
                }
            }
        }
    }

    /// Sets every aired episode of the season to `watched`; unaired episodes
    /// stay untouched whichever way the toggle goes.
    fn toggle_season(&mut self, series: SeriesId, season: u32, watched: bool) {
        let Some(season_meta) = self
            .metadata
            .get(&series)
            .and_then(|m| m.seasons.get(&season))
        else {
            warn!(series, season, "season toggle before metadata loaded");
            return;
        };
        let Some(season_rating) = self
            .store
            .get_mut(series)
            .and_then(|r| r.seasons.get_mut(&season))
        else {
            warn!(series, season, "season toggle for unknown season");
            return;
        };

        for (&episode_num, episode_meta) in &season_meta.episodes {
            let Some(episode_rating) = season_rating.episodes.get_mut(&episode_num) else {
                continue;
            };
            if episode_rating.watched == watched {
                continue;
            }
            if !has_aired(episode_meta.air_date, self.today) {
                continue;
            }
            episode_rating.watched = watched;
            self.changes
                .record_episode_watched(series, season, episode_num, watched);
        }
    }

    /// Full rescan of the affected series after every watched-state write;
    /// nothing is cached between writes.
    fn recompute(&mut self, series: SeriesId) {
        let (Some(metadata), Some(rating)) = (self.metadata.get(&series), self.store.get(series))
        else {
            return;
        };
        self.summaries
            .insert(series, view::series_summary(metadata, rating, self.today));
    }

    /// Session teardown: stop the debounce loop first so no timer flush can
    /// race, then push whatever is still pending and wait for it.
    pub async fn shutdown(self) -> Result<()> {
        self.scheduler.stop().await;
        self.changes.flush().await
    }
}
