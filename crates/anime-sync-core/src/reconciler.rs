//! Folds classified anime into the durable conversion mapping.
//!
//! The mapping is operator-owned: reconciliation fills gaps (candidates,
//! observed seasons, single-candidate season assignments) and never undoes
//! a manual edit. Entries marked `ignore` are left exactly as found, and
//! entries for items no longer in the watch history are kept.

use anime_sync_models::{AnimeRecord, CatalogCrossRef, ConversionEntry, MediaKind, SeasonToken};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::gateway::ResolutionGateway;

/// Both persisted conversion tables, keyed by tracking-service slug
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMapping {
    pub shows: BTreeMap<String, ConversionEntry>,
    pub movies: BTreeMap<String, ConversionEntry>,
}

/// Conditions that leave an entry incomplete without failing the pass
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconcileWarning {
    #[error(
        "no catalog entry for {kind} '{title}' ({external_id}, cross-ref {})",
        .cross_ref_id.as_deref().unwrap_or("none")
    )]
    MissingCrossRef {
        kind: MediaKind,
        external_id: String,
        title: String,
        cross_ref_id: Option<String>,
    },

    #[error("'{title}' ({external_id}): seasons {unmapped:?} unmapped across candidates {candidates:?}")]
    AmbiguousMapping {
        external_id: String,
        title: String,
        unmapped: BTreeSet<u32>,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub shows: usize,
    pub movies: usize,
    pub new_entries: usize,
    pub ignored: usize,
    pub auto_mapped: usize,
    pub manual: usize,
    pub missing: usize,
    pub ambiguous: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub mapping: ConversionMapping,
    pub warnings: Vec<ReconcileWarning>,
    pub stats: ReconcileStats,
}

/// Reconcile every anime item against the catalog tables and `prior`.
///
/// The gateway is consulted only for shows whose cross-ref misses the
/// catalog and that have no candidates yet. Running this twice with the
/// same inputs and a declining gateway yields the same mapping.
pub fn reconcile(
    shows: &BTreeMap<String, AnimeRecord>,
    movies: &BTreeMap<String, AnimeRecord>,
    catalog: &CatalogCrossRef,
    prior: ConversionMapping,
    gateway: &mut dyn ResolutionGateway,
) -> Reconciliation {
    let mut run = Run {
        mapping: prior,
        warnings: Vec::new(),
        stats: ReconcileStats::default(),
    };

    for (external_id, record) in shows {
        run.stats.shows += 1;
        run.show(external_id, record, catalog, gateway);
    }
    for (external_id, record) in movies {
        run.stats.movies += 1;
        run.movie(external_id, record, catalog);
    }

    info!(
        operation = "reconcile",
        shows = run.stats.shows,
        movies = run.stats.movies,
        new_entries = run.stats.new_entries,
        auto_mapped = run.stats.auto_mapped,
        warnings = run.warnings.len(),
        "Reconciliation complete"
    );

    Reconciliation {
        mapping: run.mapping,
        warnings: run.warnings,
        stats: run.stats,
    }
}

struct Run {
    mapping: ConversionMapping,
    warnings: Vec<ReconcileWarning>,
    stats: ReconcileStats,
}

impl Run {
    fn warn(&mut self, warning: ReconcileWarning) {
        warn!(operation = "reconcile", "{}", warning);
        match warning {
            ReconcileWarning::MissingCrossRef { .. } => self.stats.missing += 1,
            ReconcileWarning::AmbiguousMapping { .. } => self.stats.ambiguous += 1,
        }
        self.warnings.push(warning);
    }

    fn show(
        &mut self,
        external_id: &str,
        record: &AnimeRecord,
        catalog: &CatalogCrossRef,
        gateway: &mut dyn ResolutionGateway,
    ) {
        if self.mapping.shows.get(external_id).is_some_and(|e| e.ignore) {
            debug!("Ignoring show '{}'", external_id);
            self.stats.ignored += 1;
            return;
        }

        let is_new = !self.mapping.shows.contains_key(external_id);
        if is_new {
            self.stats.new_entries += 1;
        }
        let entry = self
            .mapping
            .shows
            .entry(external_id.to_string())
            .or_insert_with(|| ConversionEntry::new(record.title.clone(), record.cross_ref_id.clone()));
        refresh_identity(entry, record);

        let hit = record
            .cross_ref_id
            .as_deref()
            .and_then(|id| catalog.lookup(MediaKind::Show, id));

        let mut missing = None;
        match hit {
            Some(candidates) => entry.candidate_catalog_ids = candidates.to_vec(),
            None if !entry.candidate_catalog_ids.is_empty() => {
                debug!(
                    "Keeping {} manual candidates for '{}'",
                    entry.candidate_catalog_ids.len(),
                    external_id
                );
            }
            None => {
                let manual = gateway
                    .prompt_manual_ids(&record.title)
                    .map(clean_manual_ids)
                    .filter(|ids| !ids.is_empty());
                if let Some(ids) = manual {
                    info!("Using manual catalog IDs {:?} for '{}'", ids, record.title);
                    entry.candidate_catalog_ids = ids;
                    self.stats.manual += 1;
                } else if gateway.prompt_ignore(&record.title) {
                    info!("Marking '{}' as ignored", record.title);
                    entry.ignore = true;
                    self.stats.ignored += 1;
                    return;
                } else {
                    missing = Some(ReconcileWarning::MissingCrossRef {
                        kind: MediaKind::Show,
                        external_id: external_id.to_string(),
                        title: record.title.clone(),
                        cross_ref_id: record.cross_ref_id.clone(),
                    });
                }
            }
        }

        entry.seasons_observed.extend(record.seasons());

        let unmapped = entry.unmapped_seasons();
        let ambiguous = if unmapped.is_empty() {
            None
        } else {
            match entry.candidate_catalog_ids.as_slice() {
                [] => None,
                // A key naming any other catalog ID is a manual split and is
                // left alone. The sole candidate's seasons are extended, not
                // replaced, so every observed season stays assigned once.
                [only] if entry.mappings.keys().all(|id| id == only) => {
                    let only = only.clone();
                    let tokens = entry.seasons_observed.iter().copied().map(SeasonToken::from);
                    entry.mappings.entry(only).or_default().extend(tokens);
                    self.stats.auto_mapped += 1;
                    None
                }
                candidates => Some(ReconcileWarning::AmbiguousMapping {
                    external_id: external_id.to_string(),
                    title: record.title.clone(),
                    unmapped,
                    candidates: candidates.to_vec(),
                }),
            }
        };

        if let Some(warning) = missing {
            self.warn(warning);
        }
        if let Some(warning) = ambiguous {
            self.warn(warning);
        }
    }

    fn movie(&mut self, external_id: &str, record: &AnimeRecord, catalog: &CatalogCrossRef) {
        let prior = self.mapping.movies.get(external_id);
        if prior.is_some_and(|e| e.ignore) {
            self.stats.ignored += 1;
            return;
        }

        let hit = record
            .cross_ref_id
            .as_deref()
            .and_then(|id| catalog.lookup(MediaKind::Movie, id));

        match hit {
            Some(candidates) => {
                if prior.is_none() {
                    self.stats.new_entries += 1;
                }
                let entry = self
                    .mapping
                    .movies
                    .entry(external_id.to_string())
                    .or_insert_with(|| ConversionEntry::new(record.title.clone(), record.cross_ref_id.clone()));
                refresh_identity(entry, record);
                entry.candidate_catalog_ids = candidates.to_vec();
            }
            None if prior.is_some_and(|e| !e.candidate_catalog_ids.is_empty()) => {
                debug!("Keeping existing candidates for movie '{}'", external_id);
            }
            None => self.warn(ReconcileWarning::MissingCrossRef {
                kind: MediaKind::Movie,
                external_id: external_id.to_string(),
                title: record.title.clone(),
                cross_ref_id: record.cross_ref_id.clone(),
            }),
        }
    }
}

fn refresh_identity(entry: &mut ConversionEntry, record: &AnimeRecord) {
    entry.title.clone_from(&record.title);
    if record.cross_ref_id.is_some() {
        entry.cross_ref_id.clone_from(&record.cross_ref_id);
    }
}

/// Trim, drop blanks, and dedup keeping the order the operator typed
fn clean_manual_ids(ids: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim();
        if !id.is_empty() && !cleaned.iter().any(|c| c == id) {
            cleaned.push(id.to_string());
        }
    }
    cleaned
}
