//! Timestamp handling for tracking-service watch data.
//!
//! Timestamps are parsed once where they enter the system and carried as
//! `Option<DateTime<Utc>>` afterwards. A value that is missing or cannot be
//! parsed becomes `None`, which the incremental gate treats as "always
//! inspect".

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Parse an RFC 3339 timestamp as reported by Trakt (`2024-03-01T12:30:45.000Z`)
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Truncate to whole seconds; the skip gate compares at this granularity
pub fn to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

/// Serde adapter for `Option<DateTime<Utc>>` that never fails on read.
///
/// Anything other than a parseable RFC 3339 string deserializes to `None`.
pub mod lenient {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse))
    }
}
