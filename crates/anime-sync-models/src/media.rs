use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Show,
    Movie,
}

impl MediaKind {
    /// Path segment used by the tracking service for this kind
    pub fn plural(&self) -> &'static str {
        match self {
            MediaKind::Show => "shows",
            MediaKind::Movie => "movies",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Show => write!(f, "show"),
            MediaKind::Movie => write!(f, "movie"),
        }
    }
}
