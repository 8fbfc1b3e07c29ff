use anime_sync_models::ConversionEntry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

use crate::error::SyncError;
use crate::reconciler::ConversionMapping;
use crate::storage;

/// The show and movie mapping files, read and written together
pub struct ConversionStore {
    shows_path: PathBuf,
    movies_path: PathBuf,
}

impl ConversionStore {
    pub fn new(shows_path: PathBuf, movies_path: PathBuf) -> Self {
        Self {
            shows_path,
            movies_path,
        }
    }

    pub fn load(&self) -> Result<ConversionMapping, SyncError> {
        let shows: BTreeMap<String, ConversionEntry> =
            storage::load_or_recover(&self.shows_path, "shows mapping")?.unwrap_or_default();
        let movies: BTreeMap<String, ConversionEntry> =
            storage::load_or_recover(&self.movies_path, "movies mapping")?.unwrap_or_default();
        debug!("Loaded conversion mapping: {} shows, {} movies", shows.len(), movies.len());
        Ok(ConversionMapping { shows, movies })
    }

    pub fn save(&self, mapping: &ConversionMapping) -> Result<(), SyncError> {
        storage::write_json_atomic(&self.shows_path, &mapping.shows)?;
        storage::write_json_atomic(&self.movies_path, &mapping.movies)
    }
}
