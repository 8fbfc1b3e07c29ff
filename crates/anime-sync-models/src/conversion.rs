use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A season assignment inside `ConversionEntry::mappings`.
///
/// Written as a bare number, or `"*"` for every season including ones not
/// watched yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeasonToken {
    Season(u32),
    All,
}

impl SeasonToken {
    pub const WILDCARD: &'static str = "*";
}

impl fmt::Display for SeasonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonToken::Season(n) => write!(f, "{}", n),
            SeasonToken::All => f.write_str(Self::WILDCARD),
        }
    }
}

impl From<u32> for SeasonToken {
    fn from(season: u32) -> Self {
        SeasonToken::Season(season)
    }
}

impl Serialize for SeasonToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SeasonToken::Season(n) => serializer.serialize_u32(*n),
            SeasonToken::All => serializer.serialize_str(Self::WILDCARD),
        }
    }
}

impl<'de> Deserialize<'de> for SeasonToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(SeasonToken::Season(n)),
            Raw::Text(s) => {
                let s = s.trim();
                if s == Self::WILDCARD {
                    Ok(SeasonToken::All)
                } else {
                    // Hand-edited files sometimes quote season numbers
                    s.parse::<u32>()
                        .map(SeasonToken::Season)
                        .map_err(|_| de::Error::custom(format!("invalid season token: {:?}", s)))
                }
            }
        }
    }
}

/// The human-correctable record tying one tracked item to catalog entries.
///
/// Operators edit `mappings` and `ignore` by hand; reconciliation only ever
/// adds to `seasons_observed` and fills `mappings` when there is exactly one
/// candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionEntry {
    pub title: String,
    #[serde(default)]
    pub cross_ref_id: Option<String>,
    #[serde(default)]
    pub candidate_catalog_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub seasons_observed: BTreeSet<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: BTreeMap<String, BTreeSet<SeasonToken>>,
    #[serde(default)]
    pub ignore: bool,
}

impl ConversionEntry {
    pub fn new(title: impl Into<String>, cross_ref_id: Option<String>) -> Self {
        Self {
            title: title.into(),
            cross_ref_id,
            candidate_catalog_ids: Vec::new(),
            seasons_observed: BTreeSet::new(),
            mappings: BTreeMap::new(),
            ignore: false,
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.mappings
            .values()
            .any(|tokens| tokens.contains(&SeasonToken::All))
    }

    /// Union of all explicitly assigned season numbers
    pub fn mapped_seasons(&self) -> BTreeSet<u32> {
        self.mappings
            .values()
            .flatten()
            .filter_map(|token| match token {
                SeasonToken::Season(n) => Some(*n),
                SeasonToken::All => None,
            })
            .collect()
    }

    /// Observed seasons not covered by any mapping. Always empty once a
    /// wildcard mapping exists.
    pub fn unmapped_seasons(&self) -> BTreeSet<u32> {
        if self.has_wildcard() {
            return BTreeSet::new();
        }
        let mapped = self.mapped_seasons();
        self.seasons_observed.difference(&mapped).copied().collect()
    }
}
