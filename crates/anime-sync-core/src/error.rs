use anime_sync_sources::SourceError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a reconciliation pass.
///
/// Missing cross-references and ambiguous mappings are not errors; they are
/// reported as `ReconcileWarning`s and the pass completes.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials missing, rejected, or not refreshable
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The bulk anime list could not be downloaded
    #[error("fetching the anime list failed: {0}")]
    FetchFailed(#[source] SourceError),

    #[error("tracking service request failed: {0}")]
    Tracking(#[source] SourceError),

    /// A persisted store exists but cannot be parsed
    #[error("malformed cache file {}: {reason}", .path.display())]
    MalformedCache { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Route a tracking-service failure, keeping auth failures distinct
    pub fn from_tracking(err: SourceError) -> Self {
        match err {
            SourceError::Auth(msg) => SyncError::Auth(msg),
            other => SyncError::Tracking(other),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }
}
