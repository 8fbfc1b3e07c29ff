use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::media::MediaKind;

/// What the user has watched of an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum WatchProgress {
    /// Season number → watched episode numbers. Seasons without a watched
    /// episode are not present.
    Show { seasons: BTreeMap<u32, BTreeSet<u32>> },
    Movie { watched: bool },
}

/// One show or movie from the tracking service's watch history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchedItem {
    /// Tracking-service slug
    pub external_id: String,
    pub title: String,
    /// TVDB id for shows, TMDB id for movies
    pub cross_ref_id: Option<String>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub progress: WatchProgress,
}

impl WatchedItem {
    pub fn kind(&self) -> MediaKind {
        match self.progress {
            WatchProgress::Show { .. } => MediaKind::Show,
            WatchProgress::Movie { .. } => MediaKind::Movie,
        }
    }

    pub fn seasons(&self) -> BTreeMap<u32, BTreeSet<u32>> {
        match &self.progress {
            WatchProgress::Show { seasons } => seasons.clone(),
            WatchProgress::Movie { .. } => BTreeMap::new(),
        }
    }
}
