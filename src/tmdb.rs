use crate::models::SeriesId;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";
const POSTER_BASE: &str = "https://image.tmdb.org/t/p/w342";

#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search_tv(&self, query: &str, page: u32) -> Result<SearchPage>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub page: u32,
    pub results: Vec<SearchResult>,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: SeriesId,
    pub name: String,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
}

impl TmdbClient {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("TMDB_API_KEY").context("TMDB_API_KEY not set")?;
        Ok(Self {
            client: Client::new(),
            api_key,
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T> {
        let res = self.client.get(url).send().await.context("request failed")?;
        let status = res.status();
        let text = res.text().await.context("reading body failed")?;
        if !status.is_success() {
            return Err(anyhow!("{} -> {}", url, text));
        }
        let parsed: T = serde_json::from_str(&text).context("JSON parse failed")?;
        Ok(parsed)
    }
}

#[async_trait]
impl SearchApi for TmdbClient {
    async fn search_tv(&self, query: &str, page: u32) -> Result<SearchPage> {
        let url = format!(
            "{TMDB_BASE}/search/tv?api_key={}&query={}&page={page}",
            self.api_key,
            urlencoding::encode(query)
        );
        let mut data: SearchPage = self.get_json(&url).await?;
        drop_posterless(&mut data);
        Ok(data)
    }
}

/// Results without a poster render as blank tiles, so they are removed
/// before anything displays them.
pub fn drop_posterless(page: &mut SearchPage) {
    page.results.retain(|r| r.poster_path.is_some());
}

pub fn poster_url(poster_path: &str) -> String {
    format!("{POSTER_BASE}{poster_path}")
}
