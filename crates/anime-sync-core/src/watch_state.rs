use anime_sync_models::{timestamp, AnimeRecord, Classification, ClassificationRecord, WatchedItem};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

use crate::error::SyncError;
use crate::storage;

/// Per-item classification memory for one media kind.
///
/// Persisted as `{"anime": {slug: record}, "other": [slug, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchState {
    #[serde(default)]
    pub anime: BTreeMap<String, AnimeRecord>,
    #[serde(default)]
    pub other: BTreeSet<String>,
}

impl WatchState {
    /// `other` wins if a hand-edited file lists an item in both sections
    pub fn record(&self, external_id: &str) -> Option<ClassificationRecord> {
        if self.other.contains(external_id) {
            return Some(ClassificationRecord {
                classification: Classification::Other,
                last_updated_at: None,
            });
        }
        self.anime.get(external_id).map(|record| ClassificationRecord {
            classification: Classification::Anime,
            last_updated_at: record.last_updated_at,
        })
    }

    /// Record a classification outcome. `None` (no usable genres) leaves
    /// whatever was stored before.
    pub fn apply(&mut self, item: &WatchedItem, classification: Option<Classification>) {
        match classification {
            Some(Classification::Anime) => {
                self.other.remove(&item.external_id);
                self.anime.insert(item.external_id.clone(), AnimeRecord::from_item(item));
            }
            Some(Classification::Other) => {
                self.anime.remove(&item.external_id);
                self.other.insert(item.external_id.clone());
            }
            None => {}
        }
    }
}

/// Whether `item` has to go through the classifier on this pass.
///
/// Skips when not forced and a record exists that is either `other` (a
/// terminal classification) or at least as new as the item, compared at
/// whole seconds. A missing timestamp on either side means inspect.
pub fn should_inspect(item: &WatchedItem, record: Option<&ClassificationRecord>, force_refresh: bool) -> bool {
    if force_refresh {
        return true;
    }
    let Some(record) = record else {
        return true;
    };
    if record.classification == Classification::Other {
        return false;
    }
    match (record.last_updated_at, item.last_updated_at) {
        (Some(stored), Some(incoming)) => timestamp::to_second(stored) < timestamp::to_second(incoming),
        _ => true,
    }
}

/// File-backed `WatchState`
pub struct WatchStateStore {
    path: PathBuf,
    label: &'static str,
}

impl WatchStateStore {
    pub fn new(path: PathBuf, label: &'static str) -> Self {
        Self { path, label }
    }

    /// Load the store; a missing or malformed file yields an empty state
    pub fn load(&self) -> Result<WatchState, SyncError> {
        let state: WatchState = storage::load_or_recover(&self.path, self.label)?.unwrap_or_default();
        debug!(
            "Loaded {}: {} anime, {} other",
            self.label,
            state.anime.len(),
            state.other.len()
        );
        Ok(state)
    }

    pub fn save(&self, state: &WatchState) -> Result<(), SyncError> {
        storage::write_json_atomic(&self.path, state)
    }
}
