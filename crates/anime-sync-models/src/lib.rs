pub mod catalog;
pub mod classification;
pub mod conversion;
pub mod media;
pub mod timestamp;
pub mod watched;

pub use catalog::{CatalogCrossRef, RawCatalogRecord};
pub use classification::{AnimeRecord, Classification, ClassificationRecord};
pub use conversion::{ConversionEntry, SeasonToken};
pub use media::MediaKind;
pub use watched::{WatchProgress, WatchedItem};
