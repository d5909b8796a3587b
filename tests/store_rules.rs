use chrono::NaiveDate;
use showsync::api::AccountApi;
use showsync::changes::ChangeSet;
use showsync::models::{
    has_aired, parse_air_date, EpisodeMetadata, SeasonMetadata, SeriesMetadata, SeriesRating,
};
use showsync::ratings::RatingStore;
use showsync::tmdb::{drop_posterless, poster_url, SearchPage, SearchResult};
use showsync::view::{season_watched, series_summary};
use std::collections::HashMap;

struct CannedRatings(Vec<SeriesRating>);

#[async_trait::async_trait]
impl AccountApi for CannedRatings {
    async fn fetch_ratings(&self) -> anyhow::Result<HashMap<u32, SeriesRating>> {
        Ok(self.0.iter().map(|r| (r.id, r.clone())).collect())
    }

    async fn push_changes(&self, _changes: &ChangeSet) -> anyhow::Result<()> {
        Ok(())
    }

    async fn fetch_series(&self, series: u32) -> anyhow::Result<SeriesMetadata> {
        Err(anyhow::anyhow!("no metadata for {} in this test", series))
    }

    async fn ingest_series(&self, _series: u32) -> anyhow::Result<()> {
        Ok(())
    }
}

async fn store_of(names: &[(u32, &str)]) -> RatingStore {
    let api = CannedRatings(
        names
            .iter()
            .map(|&(id, name)| SeriesRating::new(id, name))
            .collect(),
    );
    RatingStore::load(&api).await.expect("store load")
}

fn day(raw: &str) -> NaiveDate {
    parse_air_date(raw).expect("valid date")
}

fn season_of(airs: &[&str]) -> SeasonMetadata {
    SeasonMetadata {
        episodes: airs
            .iter()
            .enumerate()
            .map(|(i, air)| {
                (
                    i as u32 + 1,
                    EpisodeMetadata {
                        air_date: parse_air_date(air),
                    },
                )
            })
            .collect(),
    }
}

fn metadata(id: u32, name: &str, seasons: &[(u32, &[&str])]) -> SeriesMetadata {
    SeriesMetadata {
        id,
        name: name.to_string(),
        poster_path: None,
        seasons: seasons
            .iter()
            .map(|&(num, airs)| (num, season_of(airs)))
            .collect(),
    }
}

#[test]
fn air_dates_parse_leniently() {
    assert_eq!(parse_air_date("2024-03-15"), NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(parse_air_date(" 2024-03-15 "), NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(parse_air_date(""), None);
    assert_eq!(parse_air_date("soon"), None);
    assert_eq!(parse_air_date("2024-13-40"), None);
}

#[test]
fn airing_today_counts_as_aired() {
    let today = day("2024-03-15");
    assert!(has_aired(Some(day("2024-03-14")), today));
    assert!(has_aired(Some(day("2024-03-15")), today));
    assert!(!has_aired(Some(day("2024-03-16")), today));
    assert!(!has_aired(None, today));
}

#[tokio::test]
async fn sorting_ignores_a_leading_the() {
    let mut store = store_of(&[(1, "The Wire"), (2, "Archer"), (3, "The Office")]).await;
    store.sort_alphabetical();
    let names: Vec<String> = store.list().map(|r| r.name.clone()).collect();
    assert_eq!(names, ["Archer", "The Office", "The Wire"]);

    // repeat sorts must not shuffle anything
    store.sort_alphabetical();
    let again: Vec<String> = store.list().map(|r| r.name.clone()).collect();
    assert_eq!(again, names);
}

#[tokio::test]
async fn sorting_survives_multibyte_names() {
    let mut store = store_of(&[(1, "テラスハウス"), (2, "Archer"), (3, "The 嵐")]).await;
    store.sort_alphabetical();
    let names: Vec<String> = store.list().map(|r| r.name.clone()).collect();
    // "The " strips only when the first four bytes are exactly that prefix
    assert_eq!(names, ["Archer", "テラスハウス", "The 嵐"]);
}

#[tokio::test]
async fn sorting_is_case_insensitive() {
    let mut store = store_of(&[(1, "the expanse"), (2, "Fargo"), (3, "ARCHER")]).await;
    store.sort_alphabetical();
    let names: Vec<&str> = store.list().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["ARCHER", "the expanse", "Fargo"]);
}

#[tokio::test]
async fn reconcile_fills_gaps_and_is_idempotent() {
    let mut store = store_of(&[(7, "Archer")]).await;
    {
        let rating = store.get_mut(7).unwrap();
        let episode = rating
            .seasons
            .entry(1)
            .or_default()
            .episodes
            .entry(1)
            .or_default();
        episode.watched = true;
        episode.rating = 4;
    }

    let meta = metadata(
        7,
        "Archer",
        &[(1, &["2024-01-01", "2024-01-08"]), (2, &["2024-02-01"])],
    );
    store.reconcile(&meta);

    let after_once = store.get(7).unwrap().seasons.clone();
    // the pre-existing entry survives untouched
    assert!(after_once[&1].episodes[&1].watched);
    assert_eq!(after_once[&1].episodes[&1].rating, 4);
    // the gaps got zero-value entries
    assert!(!after_once[&1].episodes[&2].watched);
    assert_eq!(after_once[&1].episodes[&2].rating, 0);
    assert!(!after_once[&2].episodes[&1].watched);

    store.reconcile(&meta);
    assert_eq!(store.get(7).unwrap().seasons, after_once);
}

#[tokio::test]
async fn reconcile_never_removes_stale_entries() {
    let mut store = store_of(&[(7, "Archer")]).await;
    store
        .get_mut(7)
        .unwrap()
        .seasons
        .entry(9)
        .or_default()
        .episodes
        .entry(1)
        .or_default()
        .watched = true;

    // metadata no longer lists season 9
    store.reconcile(&metadata(7, "Archer", &[(1, &["2024-01-01"])]));

    let seasons = &store.get(7).unwrap().seasons;
    assert!(seasons[&9].episodes[&1].watched);
    assert!(seasons.contains_key(&1));
}

#[tokio::test]
async fn add_series_starts_tracked_and_unrated() {
    let mut store = store_of(&[(7, "Archer")]).await;
    assert!(!store.contains(5));
    let added = store.add_series(5, "Fargo");
    assert!(added.tracking);
    assert_eq!(added.rating, 0);
    assert!(added.seasons.is_empty());
    assert_eq!(store.len(), 2);
    // appended at the end until the caller re-sorts
    assert_eq!(store.list().last().map(|r| r.id), Some(5));
}

#[test]
fn summary_counts_only_aired_unwatched_episodes() {
    let today = day("2024-03-15");
    let meta = metadata(7, "Archer", &[(1, &["2024-01-01", "2024-01-08", "2024-01-15"])]);
    let mut rating = SeriesRating::new(7, "Archer");
    for episode in 1..=3 {
        rating
            .seasons
            .entry(1)
            .or_default()
            .episodes
            .entry(episode)
            .or_default()
            .watched = episode <= 2;
    }

    let summary = series_summary(&meta, &rating, today);
    assert_eq!(summary.unwatched_aired, 1);
    assert_eq!(summary.next_air_date, None);
    assert!(!summary.seen_all());

    rating.seasons.get_mut(&1).unwrap().episodes.get_mut(&3).unwrap().watched = true;
    let summary = series_summary(&meta, &rating, today);
    assert_eq!(summary.unwatched_aired, 0);
    assert!(summary.seen_all());
}

#[test]
fn summary_stops_scanning_a_season_at_the_first_unaired_episode() {
    let today = day("2024-03-15");
    // episode 3 aired but sits behind the unaired episode 2, so it is not counted
    let meta = metadata(7, "Archer", &[(1, &["2024-01-01", "2024-04-01", "2024-01-15"])]);
    let rating_meta_defaults = {
        let mut rating = SeriesRating::new(7, "Archer");
        for episode in 1..=3 {
            rating
                .seasons
                .entry(1)
                .or_default()
                .episodes
                .entry(episode)
                .or_default();
        }
        rating
    };

    let summary = series_summary(&meta, &rating_meta_defaults, today);
    assert_eq!(summary.unwatched_aired, 1);
    assert_eq!(summary.next_air_date, Some(day("2024-04-01")));
}

#[test]
fn summary_keeps_the_earliest_next_air_date_across_seasons() {
    let today = day("2024-03-15");
    let meta = metadata(7, "Archer", &[(1, &["2024-05-01"]), (2, &["2024-04-01"])]);
    let mut rating = SeriesRating::new(7, "Archer");
    rating.seasons.entry(1).or_default().episodes.entry(1).or_default();
    rating.seasons.entry(2).or_default().episodes.entry(1).or_default();

    let summary = series_summary(&meta, &rating, today);
    assert_eq!(summary.next_air_date, Some(day("2024-04-01")));
}

#[test]
fn undated_episode_ends_the_scan_without_a_next_date() {
    let today = day("2024-03-15");
    let meta = metadata(7, "Archer", &[(1, &["2024-01-01", ""])]);
    let mut rating = SeriesRating::new(7, "Archer");
    let episodes = &mut rating.seasons.entry(1).or_default().episodes;
    episodes.entry(1).or_default().watched = true;
    episodes.entry(2).or_default();

    let summary = series_summary(&meta, &rating, today);
    assert_eq!(summary.unwatched_aired, 0);
    // no date to report, but nothing aired is pending either
    assert_eq!(summary.next_air_date, None);
    assert!(summary.seen_all());
}

#[test]
fn season_watched_requires_every_metadata_episode() {
    let season_meta = season_of(&["2024-01-01", "2024-01-08"]);
    let mut season_rating = showsync::models::SeasonRating::default();
    season_rating.episodes.entry(1).or_default().watched = true;
    assert!(!season_watched(&season_meta, &season_rating));

    season_rating.episodes.entry(2).or_default().watched = true;
    assert!(season_watched(&season_meta, &season_rating));
}

#[test]
fn posterless_search_results_are_dropped() {
    let result = |id: u32, poster: Option<&str>| SearchResult {
        id,
        name: format!("show {id}"),
        poster_path: poster.map(|p| p.to_string()),
        first_air_date: None,
    };
    let mut page = SearchPage {
        page: 1,
        results: vec![
            result(1, Some("/a.jpg")),
            result(2, None),
            result(3, Some("/c.jpg")),
        ],
        total_pages: 3,
    };

    drop_posterless(&mut page);
    let ids: Vec<u32> = page.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, [1, 3]);
    assert_eq!(
        poster_url("/a.jpg"),
        "https://image.tmdb.org/t/p/w342/a.jpg"
    );
}
