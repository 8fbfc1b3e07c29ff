use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::timestamp;
use crate::watched::WatchedItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Anime,
    Other,
}

/// The gate's view of a stored item: what it was classified as, and from
/// which watch-data timestamp. `Other` items carry no timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRecord {
    pub classification: Classification,
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Snapshot of an anime item's watch data as of its last inspection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnimeRecord {
    pub title: String,
    #[serde(default)]
    pub cross_ref_id: Option<String>,
    #[serde(default, with = "timestamp::lenient")]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub watched: BTreeMap<u32, BTreeSet<u32>>,
}

impl AnimeRecord {
    pub fn from_item(item: &WatchedItem) -> Self {
        Self {
            title: item.title.clone(),
            cross_ref_id: item.cross_ref_id.clone(),
            last_updated_at: item.last_updated_at,
            watched: item.seasons(),
        }
    }

    pub fn seasons(&self) -> impl Iterator<Item = u32> + '_ {
        self.watched.keys().copied()
    }
}
