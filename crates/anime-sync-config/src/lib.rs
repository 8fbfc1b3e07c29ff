pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{CatalogConfig, Config, ReconcileConfig, TraktConfig, DEFAULT_CATALOG_LIST_URL};
pub use credentials::CredentialStore;
pub use paths::{PathManager, container_base_path};
