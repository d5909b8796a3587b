use crate::changes::ChangeSet;
use crate::models::{SeriesId, SeriesMetadata, SeriesRating};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use tracing::{debug, info};

#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn fetch_ratings(&self) -> Result<HashMap<SeriesId, SeriesRating>>;
    async fn push_changes(&self, changes: &ChangeSet) -> Result<()>;
    async fn fetch_series(&self, series: SeriesId) -> Result<SeriesMetadata>;
    async fn ingest_series(&self, series: SeriesId) -> Result<()>;
}

pub struct HttpAccountApi {
    client: Client,
    base_url: String,
    // one GET per session; repeated loads reuse the first response
    ratings_cache: tokio::sync::Mutex<Option<HashMap<SeriesId, SeriesRating>>>,
}

impl HttpAccountApi {
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("SHOWSYNC_API_BASE").context("SHOWSYNC_API_BASE not set")?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            ratings_cache: tokio::sync::Mutex::new(None),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self.client.get(url).send().await.context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {} {}", url, status, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl AccountApi for HttpAccountApi {
    async fn fetch_ratings(&self) -> Result<HashMap<SeriesId, SeriesRating>> {
        let mut cache = self.ratings_cache.lock().await;
        if let Some(ratings) = cache.as_ref() {
            return Ok(ratings.clone());
        }

        let url = format!("{}/account/rating", self.base_url);
        let ratings: HashMap<SeriesId, SeriesRating> = self.get_json(&url).await?;
        info!(series = ratings.len(), "loaded account ratings");
        *cache = Some(ratings.clone());
        Ok(ratings)
    }

    async fn push_changes(&self, changes: &ChangeSet) -> Result<()> {
        let url = format!("{}/account/rating", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(changes)
            .send()
            .await
            .context("rating sync request failed")?;
        if !res.status().is_success() {
            return Err(anyhow!("rating sync rejected: {} -> {}", url, res.status()));
        }
        Ok(())
    }

    async fn fetch_series(&self, series: SeriesId) -> Result<SeriesMetadata> {
        let url = format!("{}/series/{}", self.base_url, series);
        let metadata: SeriesMetadata = self.get_json(&url).await?;
        debug!(series, "loaded series metadata");
        Ok(metadata)
    }

    async fn ingest_series(&self, series: SeriesId) -> Result<()> {
        let url = format!("{}/series/{}", self.base_url, series);
        let res = self
            .client
            .post(&url)
            .send()
            .await
            .context("series ingest request failed")?;
        if !res.status().is_success() {
            return Err(anyhow!("series ingest rejected: {} -> {}", url, res.status()));
        }
        info!(series, "server ingesting series");
        Ok(())
    }
}
