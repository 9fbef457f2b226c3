// Catalog service client and the all-or-nothing catalog loader.

use async_trait::async_trait;
use overcoach_core::{Hero, HeroCatalog, OverwatchMap};
use thiserror::Error;
use tracing::{info, warn};

use crate::{decode_json, endpoint, ClientError};

pub const DEFAULT_OVERFAST_URL: &str = "https://overfast-api.tekrop.fr";

/// The catalog failed to load. No partial catalog is ever produced.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to fetch heroes: {0}")]
    Heroes(#[source] ClientError),

    #[error("failed to fetch maps: {0}")]
    Maps(#[source] ClientError),
}

/// Source of hero and map data.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_heroes(&self) -> Result<Vec<Hero>, ClientError>;
    async fn fetch_maps(&self) -> Result<Vec<OverwatchMap>, ClientError>;
}

/// OverFast API client.
pub struct OverfastClient {
    http: reqwest::Client,
    base_url: String,
}

impl OverfastClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    /// Share an existing connection pool.
    pub fn with_http(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for OverfastClient {
    async fn fetch_heroes(&self) -> Result<Vec<Hero>, ClientError> {
        let url = endpoint(&self.base_url, "heroes");
        let response = self.http.get(&url).send().await?;
        decode_json(response, &url).await
    }

    async fn fetch_maps(&self) -> Result<Vec<OverwatchMap>, ClientError> {
        let url = endpoint(&self.base_url, "maps");
        let response = self.http.get(&url).send().await?;
        decode_json(response, &url).await
    }
}

/// Fetch heroes and maps concurrently. Both must succeed.
pub async fn load_catalog(source: &dyn CatalogSource) -> Result<HeroCatalog, CatalogLoadError> {
    let heroes = async { source.fetch_heroes().await.map_err(CatalogLoadError::Heroes) };
    let maps = async { source.fetch_maps().await.map_err(CatalogLoadError::Maps) };

    match tokio::try_join!(heroes, maps) {
        Ok((heroes, maps)) => {
            info!("Catalog loaded: {} heroes, {} maps", heroes.len(), maps.len());
            Ok(HeroCatalog::new(heroes, maps))
        }
        Err(e) => {
            warn!("Catalog load failed: {}", e);
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
