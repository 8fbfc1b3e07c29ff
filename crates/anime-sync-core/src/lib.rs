pub mod catalog_index;
pub mod classifier;
pub mod conversion_store;
pub mod error;
pub mod gateway;
pub mod pass;
pub mod reconciler;
pub mod session;
pub mod storage;
pub mod watch_state;

#[cfg(test)]
mod test_support;

pub use catalog_index::{CatalogFreshness, CatalogIndex};
pub use classifier::{classify_genres, ClassifySummary, Classifier};
pub use conversion_store::ConversionStore;
pub use error::SyncError;
pub use gateway::{DecliningGateway, ResolutionGateway};
pub use pass::{NoopObserver, PassObserver, PassOptions, PassSummary, ReconciliationPass};
pub use reconciler::{reconcile, ConversionMapping, ReconcileStats, ReconcileWarning, Reconciliation};
pub use session::SessionManager;
pub use watch_state::{should_inspect, WatchState, WatchStateStore};
