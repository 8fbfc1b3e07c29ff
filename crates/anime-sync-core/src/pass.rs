use anime_sync_config::{Config, PathManager};
use anime_sync_models::{Classification, MediaKind, WatchedItem};
use anime_sync_sources::{CatalogListSource, SourceError, TrackingService, TraktCredentials, TraktSession};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::catalog_index::{CatalogFreshness, CatalogIndex};
use crate::classifier::{Classifier, ClassifySummary};
use crate::conversion_store::ConversionStore;
use crate::error::SyncError;
use crate::gateway::ResolutionGateway;
use crate::reconciler::{reconcile, ReconcileStats, ReconcileWarning};
use crate::session::SessionManager;
use crate::watch_state::{WatchState, WatchStateStore};

#[derive(Debug, Clone, Copy, Default)]
pub struct PassOptions {
    /// Reclassify every item, including ones already classified `other`
    pub force_refresh: bool,
    /// Download the anime list even if the cached copy is fresh
    pub refresh_catalog: bool,
}

/// Progress hooks for front ends. All methods default to no-ops.
pub trait PassObserver {
    fn catalog_ready(&self, _freshness: CatalogFreshness, _date: NaiveDate) {}

    fn classify_started(&self, _kind: MediaKind, _total: usize) {}

    /// Called once per item, with `None` for skipped or unclassified items
    fn item_classified(&self, _kind: MediaKind, _item: &WatchedItem, _classification: Option<Classification>) {}

    fn classify_finished(&self, _kind: MediaKind, _summary: &ClassifySummary) {}
}

pub struct NoopObserver;

impl PassObserver for NoopObserver {}

#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub shows: ClassifySummary,
    pub movies: ClassifySummary,
    pub catalog: CatalogFreshness,
    pub catalog_date: NaiveDate,
    pub reconcile: ReconcileStats,
    pub warnings: Vec<ReconcileWarning>,
    /// Whether the session had to be renewed mid-pass
    pub reauthenticated: bool,
    pub duration_ms: u64,
}

/// The session in use plus the single renewal a pass is allowed
struct LiveSession {
    manager: SessionManager,
    session: TraktSession,
    renewed: bool,
}

impl LiveSession {
    async fn renew(
        &mut self,
        trakt: &dyn TrackingService,
        gateway: &mut dyn ResolutionGateway,
        cause: SourceError,
    ) -> Result<(), SyncError> {
        if self.renewed {
            return Err(SyncError::from_tracking(cause));
        }
        self.renewed = true;
        warn!(
            operation = "auth",
            status = "expired",
            error = %cause,
            "Trakt rejected the session mid-pass; re-authenticating"
        );
        self.session = self.manager.refresh(trakt, gateway).await?;
        Ok(())
    }
}

/// One full pass: authenticate, classify new watch data, refresh the
/// catalog tables, reconcile, and persist.
///
/// Stores are written only after every step succeeded; a failed pass
/// leaves the previous snapshots on disk.
pub struct ReconciliationPass {
    config: Config,
    paths: PathManager,
    trakt: Arc<dyn TrackingService>,
    catalog_list: Arc<dyn CatalogListSource>,
    options: PassOptions,
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl ReconciliationPass {
    pub fn new(
        config: Config,
        paths: PathManager,
        trakt: Arc<dyn TrackingService>,
        catalog_list: Arc<dyn CatalogListSource>,
    ) -> Self {
        Self {
            config,
            paths,
            trakt,
            catalog_list,
            options: PassOptions::default(),
            clock: Box::new(Utc::now),
        }
    }

    pub fn with_options(mut self, options: PassOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[instrument(skip_all)]
    pub async fn run(
        &mut self,
        gateway: &mut dyn ResolutionGateway,
        observer: &dyn PassObserver,
    ) -> Result<PassSummary, SyncError> {
        let start = Instant::now();
        let now = (self.clock)();
        let today = now.date_naive();

        info!(
            operation = "pass_start",
            force_refresh = self.options.force_refresh,
            refresh_catalog = self.options.refresh_catalog,
            "Starting reconciliation pass"
        );

        self.paths
            .ensure_directories()
            .map_err(|e| SyncError::Config(format!("failed to create data directories: {:#}", e)))?;

        let credentials = self.resolve_credentials(gateway)?;
        let mut manager = SessionManager::open(credentials, self.paths.credentials_file())?;
        let session = manager.establish(self.trakt.as_ref(), gateway, now).await?;
        let mut live = LiveSession {
            manager,
            session,
            renewed: false,
        };

        let show_store = WatchStateStore::new(self.paths.shows_cache_file(), "shows cache");
        let movie_store = WatchStateStore::new(self.paths.movies_cache_file(), "movies cache");
        let mut show_state = show_store.load()?;
        let mut movie_state = movie_store.load()?;

        let index = CatalogIndex::new(
            self.paths.anime_list_file(),
            self.config.catalog.list_url.clone(),
            self.config.catalog.max_age_days,
        );
        let (catalog, freshness) = index
            .ensure_fresh_or_stale(self.catalog_list.as_ref(), today, self.options.refresh_catalog)
            .await?;
        observer.catalog_ready(freshness, catalog.date);
        let catalog_changed = freshness == CatalogFreshness::Refreshed;

        let shows = self.classify_feed(MediaKind::Show, &mut show_state, &mut live, gateway, observer).await?;
        let movies = self.classify_feed(MediaKind::Movie, &mut movie_state, &mut live, gateway, observer).await?;

        let conversion_store = ConversionStore::new(self.paths.shows_mapping_file(), self.paths.movies_mapping_file());
        let prior = conversion_store.load()?;
        let reconciliation = reconcile(&show_state.anime, &movie_state.anime, &catalog, prior, gateway);

        show_store.save(&show_state)?;
        movie_store.save(&movie_state)?;
        conversion_store.save(&reconciliation.mapping)?;
        if catalog_changed {
            index.save(&catalog)?;
        }

        let duration = start.elapsed();
        info!(
            operation = "pass_complete",
            duration_ms = duration.as_millis() as u64,
            shows_inspected = shows.inspected,
            movies_inspected = movies.inspected,
            warnings = reconciliation.warnings.len(),
            "Reconciliation pass completed"
        );

        Ok(PassSummary {
            shows,
            movies,
            catalog: freshness,
            catalog_date: catalog.date,
            reconcile: reconciliation.stats,
            warnings: reconciliation.warnings,
            reauthenticated: live.renewed,
            duration_ms: duration.as_millis() as u64,
        })
    }

    /// Configured client credentials, or ones supplied through the gateway
    /// and written back to the config file
    fn resolve_credentials(&mut self, gateway: &mut dyn ResolutionGateway) -> Result<TraktCredentials, SyncError> {
        if !self.config.trakt.is_configured() {
            let supplied = gateway
                .prompt_credentials()
                .filter(|c| !c.client_id.trim().is_empty() && !c.client_secret.trim().is_empty())
                .ok_or_else(|| {
                    SyncError::Auth(format!(
                        "Trakt client_id and client_secret are not configured; set them in {}",
                        self.paths.config_file().display()
                    ))
                })?;

            self.config.trakt.client_id = supplied.client_id.trim().to_string();
            self.config.trakt.client_secret = supplied.client_secret.trim().to_string();
            let path = self.paths.config_file();
            self.config
                .save_to_file(&path)
                .map_err(|e| SyncError::Config(format!("failed to save {}: {:#}", path.display(), e)))?;
            info!("Saved Trakt client credentials to {}", path.display());
        }

        Ok(TraktCredentials {
            client_id: self.config.trakt.client_id.clone(),
            client_secret: self.config.trakt.client_secret.clone(),
        })
    }

    async fn list_feed(&self, kind: MediaKind, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError> {
        match kind {
            MediaKind::Show => self.trakt.list_watched_shows(session).await,
            MediaKind::Movie => self.trakt.list_watched_movies(session).await,
        }
    }

    async fn classify_feed(
        &self,
        kind: MediaKind,
        state: &mut WatchState,
        live: &mut LiveSession,
        gateway: &mut dyn ResolutionGateway,
        observer: &dyn PassObserver,
    ) -> Result<ClassifySummary, SyncError> {
        let items = loop {
            match self.list_feed(kind, &live.session).await {
                Ok(items) => break items,
                Err(e) if e.is_auth() => live.renew(self.trakt.as_ref(), gateway, e).await?,
                Err(e) => {
                    warn!(
                        operation = "list_watched",
                        kind = %kind,
                        status = "unavailable",
                        error = %e,
                        "Could not list watched {}; keeping their stored state for this pass",
                        kind.plural()
                    );
                    let summary = ClassifySummary {
                        unavailable: true,
                        ..ClassifySummary::default()
                    };
                    observer.classify_finished(kind, &summary);
                    return Ok(summary);
                }
            }
        };
        info!(operation = "list_watched", kind = %kind, count = items.len(), "Fetched watched {}", kind.plural());

        observer.classify_started(kind, items.len());
        let mut summary = ClassifySummary::default();
        loop {
            let classifier = Classifier::new(self.trakt.as_ref(), &live.session);
            match classifier
                .classify_pending(kind, &items, state, self.options.force_refresh, &mut summary, observer)
                .await
            {
                Ok(()) => break,
                Err(e) if e.is_auth() => live.renew(self.trakt.as_ref(), gateway, e).await?,
                Err(e) => {
                    warn!(
                        operation = "classify",
                        kind = %kind,
                        status = "error",
                        error = %e,
                        "Classification of watched {} stopped early",
                        kind.plural()
                    );
                    break;
                }
            }
        }
        observer.classify_finished(kind, &summary);

        info!(
            operation = "classify",
            kind = %kind,
            inspected = summary.inspected,
            skipped = summary.skipped,
            anime = summary.anime,
            other = summary.other,
            unclassified = summary.unclassified,
            "Classified watched {}",
            kind.plural()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
