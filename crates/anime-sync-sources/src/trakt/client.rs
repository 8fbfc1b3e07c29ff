use anime_sync_models::{MediaKind, WatchedItem};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::error::SourceError;
use crate::traits::TrackingService;
use crate::trakt::{api, auth, TokenInfo, TraktCredentials, TraktSession};

/// Trakt HTTP client. Holds only the connection pool; sessions are passed in.
#[derive(Clone)]
pub struct TraktClient {
    client: Arc<Client>,
}

impl TraktClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(auth::create_trakt_client()), // Use client with browser-like headers
        }
    }
}

impl Default for TraktClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackingService for TraktClient {
    fn authorize_url(&self, credentials: &TraktCredentials) -> String {
        auth::authorize_url(&credentials.client_id)
    }

    async fn exchange_code(&self, credentials: &TraktCredentials, code: &str) -> Result<TokenInfo, SourceError> {
        auth::exchange_code(&self.client, credentials, code).await
    }

    async fn refresh_token(&self, credentials: &TraktCredentials, refresh_token: &str) -> Result<TokenInfo, SourceError> {
        auth::refresh_access_token(&self.client, credentials, refresh_token).await
    }

    async fn authenticate(&self, credentials: &TraktCredentials, access_token: &str) -> Result<TraktSession, SourceError> {
        let encoded_username = api::get_encoded_username(&self.client, access_token, &credentials.client_id).await?;
        info!("Authenticated to Trakt as {}", encoded_username);
        Ok(TraktSession {
            access_token: access_token.to_string(),
            client_id: credentials.client_id.clone(),
            encoded_username,
        })
    }

    async fn list_watched_shows(&self, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError> {
        api::get_watched_shows(&self.client, session).await
    }

    async fn list_watched_movies(&self, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError> {
        api::get_watched_movies(&self.client, session).await
    }

    async fn get_genres(&self, session: &TraktSession, kind: MediaKind, external_id: &str) -> Result<Vec<String>, SourceError> {
        api::get_genres(&self.client, session, kind, external_id).await
    }
}
