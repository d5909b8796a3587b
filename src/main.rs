use anyhow::Result;
use dotenvy::dotenv;
use showsync::api::{AccountApi, HttpAccountApi};
use showsync::app::Session;
use showsync::tmdb::{SearchApi, TmdbClient};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn check_env() -> Result<()> {
    let required = ["SHOWSYNC_API_BASE", "TMDB_API_KEY"];
    for key in required {
        if env::var(key).is_err() {
            anyhow::bail!("Missing required environment variable: {}", key);
        }
    }
    info!("All required environment variables are set");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    match dotenv() {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    check_env()?;

    let api: Arc<dyn AccountApi> = Arc::new(HttpAccountApi::from_env()?);
    let search: Arc<dyn SearchApi> = Arc::new(TmdbClient::from_env()?);
    let mut session = Session::start(api, search).await?;

    let tracked: Vec<u32> = session
        .store()
        .list()
        .filter(|r| r.tracking)
        .map(|r| r.id)
        .collect();
    for series in tracked {
        if let Err(e) = session.open_series(series).await {
            warn!("skipping series {}: {:#}", series, e);
        }
    }

    for rating in session.visible_series() {
        match session.summary(rating.id) {
            Some(s) => match s.next_air_date {
                Some(date) => info!(
                    "{}: {} unwatched, next episode {}",
                    rating.name, s.unwatched_aired, date
                ),
                None => info!("{}: {} unwatched", rating.name, s.unwatched_aired),
            },
            None => info!("{}: metadata unavailable", rating.name),
        }
    }

    session.shutdown().await
}
