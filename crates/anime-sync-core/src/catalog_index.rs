use anime_sync_models::CatalogCrossRef;
use anime_sync_sources::CatalogListSource;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::storage;

/// Where this pass's cross-reference tables came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFreshness {
    /// Cached tables younger than the max age
    Cached,
    /// Downloaded during this pass
    Refreshed,
    /// Download failed; older cached tables used instead
    Stale,
}

/// Locally cached cross-reference tables built from the bulk anime list
pub struct CatalogIndex {
    path: PathBuf,
    list_url: String,
    max_age: Duration,
}

impl CatalogIndex {
    pub fn new(path: PathBuf, list_url: impl Into<String>, max_age_days: u32) -> Self {
        Self {
            path,
            list_url: list_url.into(),
            max_age: Duration::days(i64::from(max_age_days)),
        }
    }

    pub fn load_cached(&self) -> Result<Option<CatalogCrossRef>, SyncError> {
        storage::load_or_recover(&self.path, "anime list")
    }

    /// Return cached tables unless missing, stale, or `force` is set, in which
    /// case download and persist a new set. A failed download is returned as
    /// `FetchFailed` and the file on disk is left as it was.
    pub async fn ensure_fresh(
        &self,
        source: &dyn CatalogListSource,
        today: NaiveDate,
        force: bool,
    ) -> Result<CatalogCrossRef, SyncError> {
        match self.usable_cache(today, force)? {
            Ok(fresh) => Ok(fresh),
            Err(_) => self.refresh(source, today).await,
        }
    }

    /// `ensure_fresh`, falling back to stale cached tables when the download
    /// fails. Fails only when there is nothing cached at all.
    ///
    /// Downloaded tables are not written here; a pass persists them with
    /// `save` together with its other stores.
    pub async fn ensure_fresh_or_stale(
        &self,
        source: &dyn CatalogListSource,
        today: NaiveDate,
        force: bool,
    ) -> Result<(CatalogCrossRef, CatalogFreshness), SyncError> {
        let stale = match self.usable_cache(today, force)? {
            Ok(fresh) => return Ok((fresh, CatalogFreshness::Cached)),
            Err(stale) => stale,
        };

        match self.download(source, today).await {
            Ok(fresh) => Ok((fresh, CatalogFreshness::Refreshed)),
            Err(SyncError::FetchFailed(e)) => match stale {
                Some(stale) => {
                    warn!(
                        operation = "catalog_refresh",
                        status = "stale",
                        error = %e,
                        "Anime list download failed; using cached list from {}",
                        stale.date
                    );
                    Ok((stale, CatalogFreshness::Stale))
                }
                None => Err(SyncError::FetchFailed(e)),
            },
            Err(e) => Err(e),
        }
    }

    /// Download the bulk list, rebuild both tables, and persist them
    pub async fn refresh(&self, source: &dyn CatalogListSource, today: NaiveDate) -> Result<CatalogCrossRef, SyncError> {
        let cross_ref = self.download(source, today).await?;
        self.save(&cross_ref)?;
        Ok(cross_ref)
    }

    pub fn save(&self, cross_ref: &CatalogCrossRef) -> Result<(), SyncError> {
        storage::write_json_atomic(&self.path, cross_ref)
    }

    async fn download(&self, source: &dyn CatalogListSource, today: NaiveDate) -> Result<CatalogCrossRef, SyncError> {
        let records = source
            .fetch_bulk_list(&self.list_url)
            .await
            .map_err(SyncError::FetchFailed)?;

        let cross_ref = CatalogCrossRef::build(today, &records);
        info!(
            operation = "catalog_refresh",
            records = records.len(),
            shows = cross_ref.shows.len(),
            movies = cross_ref.movies.len(),
            "Rebuilt anime cross-reference tables"
        );

        Ok(cross_ref)
    }

    /// `Ok(fresh)` when the cache can be used as-is, otherwise `Err` carrying
    /// whatever was cached (possibly nothing)
    fn usable_cache(
        &self,
        today: NaiveDate,
        force: bool,
    ) -> Result<Result<CatalogCrossRef, Option<CatalogCrossRef>>, SyncError> {
        let cached = self.load_cached()?;
        Ok(match cached {
            Some(cached) if !force && !cached.is_stale(today, self.max_age) => {
                info!("Using cached anime list from {}", cached.date);
                Ok(cached)
            }
            Some(cached) => {
                info!("Anime list from {} needs refreshing", cached.date);
                Err(Some(cached))
            }
            None => Err(None),
        })
    }
}
