use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::media::MediaKind;

/// One record of the bulk anime list. Only the fields the cross-reference
/// tables need are read; IDs come through as numbers or strings depending on
/// the list revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawCatalogRecord {
    #[serde(default)]
    pub mal_id: Option<Value>,
    #[serde(default)]
    pub thetvdb_id: Option<Value>,
    #[serde(default)]
    pub themoviedb_id: Option<Value>,
}

impl RawCatalogRecord {
    pub fn catalog_id(&self) -> Option<String> {
        self.mal_id.as_ref().and_then(id_string)
    }

    pub fn cross_ref_id(&self, kind: MediaKind) -> Option<String> {
        match kind {
            MediaKind::Show => self.thetvdb_id.as_ref(),
            MediaKind::Movie => self.themoviedb_id.as_ref(),
        }
        .and_then(id_string)
    }
}

/// Normalize a numeric ID that may be encoded as a JSON number or string
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then(|| s.to_string())
        }
        _ => None,
    }
}

/// Cross-reference tables built from the bulk list, persisted with the date
/// they were fetched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogCrossRef {
    pub date: NaiveDate,
    #[serde(default)]
    pub shows: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub movies: BTreeMap<String, Vec<String>>,
}

impl CatalogCrossRef {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            shows: BTreeMap::new(),
            movies: BTreeMap::new(),
        }
    }

    /// Build both tables in one pass. Records without a catalog ID, or
    /// without the cross-ref ID for a table, do not contribute to it.
    pub fn build<'a, I>(date: NaiveDate, records: I) -> Self
    where
        I: IntoIterator<Item = &'a RawCatalogRecord>,
    {
        let mut cross_ref = Self::empty(date);
        for record in records {
            let Some(catalog_id) = record.catalog_id() else {
                continue;
            };
            for kind in [MediaKind::Show, MediaKind::Movie] {
                if let Some(cross_ref_id) = record.cross_ref_id(kind) {
                    let candidates = cross_ref.table_mut(kind).entry(cross_ref_id).or_default();
                    if !candidates.contains(&catalog_id) {
                        candidates.push(catalog_id.clone());
                    }
                }
            }
        }
        cross_ref
    }

    fn table_mut(&mut self, kind: MediaKind) -> &mut BTreeMap<String, Vec<String>> {
        match kind {
            MediaKind::Show => &mut self.shows,
            MediaKind::Movie => &mut self.movies,
        }
    }

    pub fn lookup(&self, kind: MediaKind, cross_ref_id: &str) -> Option<&[String]> {
        let table = match kind {
            MediaKind::Show => &self.shows,
            MediaKind::Movie => &self.movies,
        };
        table
            .get(cross_ref_id)
            .map(Vec::as_slice)
            .filter(|candidates| !candidates.is_empty())
    }

    /// Stale once `today - date >= max_age`; the boundary day refetches
    pub fn is_stale(&self, today: NaiveDate, max_age: Duration) -> bool {
        today.signed_duration_since(self.date) >= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawCatalogRecord {
        serde_json::from_value(value).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_build_splits_tables_and_keeps_source_order() {
        let records = vec![
            record(json!({"mal_id": 5114, "thetvdb_id": 81797})),
            record(json!({"mal_id": 121, "thetvdb_id": 81797, "anidb_id": 979})),
            record(json!({"mal_id": 199, "themoviedb_id": "129"})),
            record(json!({"mal_id": 5114, "thetvdb_id": 81797})),
        ];
        let cross_ref = CatalogCrossRef::build(date(2024, 1, 1), &records);

        assert_eq!(cross_ref.lookup(MediaKind::Show, "81797").unwrap(), ["5114", "121"]);
        assert_eq!(cross_ref.lookup(MediaKind::Movie, "129").unwrap(), ["199"]);
        assert!(cross_ref.lookup(MediaKind::Movie, "81797").is_none());
    }

    #[test]
    fn test_build_skips_records_missing_ids() {
        let records = vec![
            record(json!({"thetvdb_id": 1})),
            record(json!({"mal_id": 2})),
            record(json!({"mal_id": 3, "thetvdb_id": "unknown", "themoviedb_id": null})),
        ];
        let cross_ref = CatalogCrossRef::build(date(2024, 1, 1), &records);
        assert!(cross_ref.shows.is_empty());
        assert!(cross_ref.movies.is_empty());
    }

    #[test]
    fn test_staleness_boundary_is_inclusive() {
        let cross_ref = CatalogCrossRef::empty(date(2024, 1, 1));
        let week = Duration::days(7);
        assert!(!cross_ref.is_stale(date(2024, 1, 7), week));
        assert!(cross_ref.is_stale(date(2024, 1, 8), week));
        assert!(cross_ref.is_stale(date(2024, 2, 1), week));
        // A cache dated in the future is treated as fresh
        assert!(!cross_ref.is_stale(date(2023, 12, 25), week));
    }

    #[test]
    fn test_persisted_shape() {
        let mut cross_ref = CatalogCrossRef::empty(date(2024, 5, 6));
        cross_ref.shows.insert("1".to_string(), vec!["2".to_string()]);
        let json = serde_json::to_value(&cross_ref).unwrap();
        assert_eq!(json, json!({"date": "2024-05-06", "shows": {"1": ["2"]}, "movies": {}}));
    }
}
