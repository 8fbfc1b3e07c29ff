pub mod api;
pub mod auth;
pub mod client;

pub use auth::TokenInfo;
pub use client::TraktClient;

/// Application credentials registered with Trakt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraktCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// An authenticated Trakt session. Built once per pass and handed to every
/// call; refreshed only when a call reports an authentication failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraktSession {
    pub access_token: String,
    pub client_id: String,
    /// URL-encoded user slug
    pub encoded_username: String,
}
