use crate::models::{has_aired, SeasonMetadata, SeasonRating, SeriesMetadata, SeriesRating};
use chrono::NaiveDate;

/// Per-series counters shown next to the series name: how many aired
/// episodes are still unwatched, and when the next unaired one lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesSummary {
    pub unwatched_aired: u32,
    pub next_air_date: Option<NaiveDate>,
}

impl SeriesSummary {
    pub fn seen_all(&self) -> bool {
        self.unwatched_aired == 0 && self.next_air_date.is_none()
    }
}

/// Full scan of the series. Within a season the first unwatched episode that
/// has not aired ends that season's scan (episodes air in order); across
/// seasons the earliest such date wins.
pub fn series_summary(
    metadata: &SeriesMetadata,
    rating: &SeriesRating,
    today: NaiveDate,
) -> SeriesSummary {
    let mut summary = SeriesSummary::default();
    for (season_num, season_meta) in &metadata.seasons {
        let season_rating = rating.seasons.get(season_num);
        for (episode_num, episode_meta) in &season_meta.episodes {
            let watched = season_rating
                .and_then(|s| s.episodes.get(episode_num))
                .map(|e| e.watched)
                .unwrap_or(false);
            if watched {
                continue;
            }
            if has_aired(episode_meta.air_date, today) {
                summary.unwatched_aired += 1;
            } else {
                if let Some(date) = episode_meta.air_date {
                    summary.next_air_date = Some(match summary.next_air_date {
                        Some(earlier) if earlier <= date => earlier,
                        _ => date,
                    });
                }
                break;
            }
        }
    }
    summary
}

/// True once every episode the metadata knows about is watched. An episode
/// the rating has no entry for counts as unwatched.
pub fn season_watched(season_meta: &SeasonMetadata, season_rating: &SeasonRating) -> bool {
    season_meta
        .episodes
        .keys()
        .all(|num| season_rating.episodes.get(num).map(|e| e.watched).unwrap_or(false))
}
