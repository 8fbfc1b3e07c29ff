use anime_sync_models::{MediaKind, RawCatalogRecord, WatchedItem};
use async_trait::async_trait;

use crate::error::SourceError;
use crate::trakt::{TokenInfo, TraktCredentials, TraktSession};

/// The tracking service holding the user's watch history.
///
/// Every data call takes an explicit session; implementations keep no
/// authentication state of their own.
#[async_trait]
pub trait TrackingService: Send + Sync {
    /// URL the user visits to obtain an authorization code
    fn authorize_url(&self, credentials: &TraktCredentials) -> String;

    async fn exchange_code(
        &self,
        credentials: &TraktCredentials,
        code: &str,
    ) -> Result<TokenInfo, SourceError>;

    async fn refresh_token(
        &self,
        credentials: &TraktCredentials,
        refresh_token: &str,
    ) -> Result<TokenInfo, SourceError>;

    /// Validate an access token and build a session from it
    async fn authenticate(
        &self,
        credentials: &TraktCredentials,
        access_token: &str,
    ) -> Result<TraktSession, SourceError>;

    async fn list_watched_shows(&self, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError>;

    async fn list_watched_movies(&self, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError>;

    /// Genre slugs for one item, as listed on its detail page
    async fn get_genres(
        &self,
        session: &TraktSession,
        kind: MediaKind,
        external_id: &str,
    ) -> Result<Vec<String>, SourceError>;
}

/// Source of the bulk anime cross-reference list
#[async_trait]
pub trait CatalogListSource: Send + Sync {
    async fn fetch_bulk_list(&self, url: &str) -> Result<Vec<RawCatalogRecord>, SourceError>;
}
