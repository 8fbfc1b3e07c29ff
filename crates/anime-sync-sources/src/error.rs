use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials were rejected or have expired
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("{what} failed with status {status}: {body}")]
    Status { what: String, status: u16, body: String },

    #[error("{what} timed out after {timeout:?}")]
    Timeout { what: String, timeout: Duration },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn is_auth(&self) -> bool {
        matches!(self, SourceError::Auth(_))
    }

    /// Classify a non-success HTTP status
    pub fn from_status(what: &str, status: u16, body: String) -> Self {
        match status {
            401 | 403 => SourceError::Auth(format!("{} returned {}", what, status)),
            _ => SourceError::Status {
                what: what.to_string(),
                status,
                body,
            },
        }
    }
}
