pub mod catalog_list;
pub mod error;
pub mod traits;
pub mod trakt;

pub use catalog_list::HttpCatalogList;
pub use error::SourceError;
pub use traits::{CatalogListSource, TrackingService};
pub use trakt::{TokenInfo, TraktClient, TraktCredentials, TraktSession};
