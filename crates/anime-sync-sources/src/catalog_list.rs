use anime_sync_models::RawCatalogRecord;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::traits::CatalogListSource;

/// Downloads the bulk anime list over HTTP with a bounded request time
pub struct HttpCatalogList {
    client: Client,
    timeout: Duration,
}

impl HttpCatalogList {
    pub fn new(timeout: Duration) -> Self {
        let user_agent = format!("traktmal/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, timeout }
    }
}

#[async_trait]
impl CatalogListSource for HttpCatalogList {
    async fn fetch_bulk_list(&self, url: &str) -> Result<Vec<RawCatalogRecord>, SourceError> {
        const WHAT: &str = "anime list download";
        info!(operation = "catalog_fetch", url = url, "Downloading anime list");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::from_status(WHAT, status.as_u16(), body));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        debug!("Anime list download: {} bytes", bytes.len());

        serde_json::from_slice::<Vec<RawCatalogRecord>>(&bytes)
            .map_err(|e| SourceError::Decode(format!("{}: {}", WHAT, e)))
    }
}

impl HttpCatalogList {
    fn classify(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout {
                what: "anime list download".to_string(),
                timeout: self.timeout,
            }
        } else {
            SourceError::Http(err)
        }
    }
}
