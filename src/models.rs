use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub type SeriesId = u32;

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesMetadata {
    pub id: SeriesId,
    pub name: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub seasons: BTreeMap<u32, SeasonMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonMetadata {
    #[serde(default)]
    pub episodes: BTreeMap<u32, EpisodeMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeMetadata {
    #[serde(default, deserialize_with = "lenient_air_date")]
    pub air_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRating {
    pub id: SeriesId,
    pub name: String,
    pub tracking: bool,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub seasons: BTreeMap<u32, SeasonRating>,
}

impl SeriesRating {
    pub fn new(id: SeriesId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            tracking: true,
            rating: 0,
            seasons: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRating {
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub episodes: BTreeMap<u32, EpisodeRating>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRating {
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub rating: u8,
}

/// Air dates arrive as `YYYY-MM-DD` strings. Absent, empty or malformed
/// values mean the date is not yet known and the episode counts as not aired.
pub fn parse_air_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn lenient_air_date<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.as_deref().and_then(parse_air_date))
}

pub fn has_aired(air_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    matches!(air_date, Some(date) if date <= today)
}
