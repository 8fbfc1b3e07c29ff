use anime_sync_config::CredentialStore;
use anime_sync_sources::{TokenInfo, TrackingService, TraktCredentials, TraktSession};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::gateway::ResolutionGateway;

/// Saved tokens closer than this to expiry are refreshed up front
const EXPIRY_MARGIN_MINUTES: i64 = 5;

/// Owns the Trakt token lifecycle for one pass
pub struct SessionManager {
    credentials: TraktCredentials,
    store: CredentialStore,
}

impl SessionManager {
    /// Open the credential store at `path`; a missing file means no tokens
    pub fn open(credentials: TraktCredentials, path: PathBuf) -> Result<Self, SyncError> {
        let mut store = CredentialStore::new(path);
        store
            .load()
            .map_err(|e| SyncError::Config(format!("failed to read credential store: {:#}", e)))?;
        Ok(Self { credentials, store })
    }

    /// Build the pass's session: the saved access token when it is not about
    /// to expire and still validates, otherwise a refreshed one.
    pub async fn establish(
        &mut self,
        service: &dyn TrackingService,
        gateway: &mut dyn ResolutionGateway,
        now: DateTime<Utc>,
    ) -> Result<TraktSession, SyncError> {
        if let Some(token) = self.store.get_trakt_access_token().cloned() {
            let expires_at = self.store.get_trakt_token_expires();
            let usable = expires_at.map_or(true, |at| at > now + Duration::minutes(EXPIRY_MARGIN_MINUTES));
            if usable {
                match service.authenticate(&self.credentials, &token).await {
                    Ok(session) => {
                        info!(
                            operation = "auth",
                            status = "success",
                            "Using saved Trakt access token{}",
                            expires_at.map(|at| format!(" (expires at {})", at)).unwrap_or_default()
                        );
                        return Ok(session);
                    }
                    Err(e) if e.is_auth() => {
                        info!("Saved Trakt token appears invalid, attempting refresh");
                    }
                    Err(e) => return Err(SyncError::Tracking(e)),
                }
            } else {
                info!("Trakt access token expired or expiring soon, refreshing");
            }
        }

        self.refresh(service, gateway).await
    }

    /// Obtain new tokens: the saved refresh token first, then the
    /// authorization-code flow through `gateway`.
    pub async fn refresh(
        &mut self,
        service: &dyn TrackingService,
        gateway: &mut dyn ResolutionGateway,
    ) -> Result<TraktSession, SyncError> {
        if let Some(refresh_token) = self.store.get_trakt_refresh_token().cloned() {
            match service.refresh_token(&self.credentials, &refresh_token).await {
                Ok(tokens) => {
                    info!(operation = "auth", status = "refreshed", "Trakt access token refreshed");
                    return self.adopt(service, tokens).await;
                }
                Err(e) if e.is_auth() => {
                    warn!(operation = "auth", status = "error", error = %e, "Trakt refresh token rejected");
                    self.store.clear_trakt_tokens();
                }
                Err(e) => return Err(SyncError::Tracking(e)),
            }
        }

        self.authorize(service, gateway).await
    }

    async fn authorize(
        &mut self,
        service: &dyn TrackingService,
        gateway: &mut dyn ResolutionGateway,
    ) -> Result<TraktSession, SyncError> {
        let url = service.authorize_url(&self.credentials);
        let code = gateway
            .prompt_authorization_code(&url)
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                SyncError::Auth("Trakt authorization required; run interactively to authorize".to_string())
            })?;

        let tokens = service
            .exchange_code(&self.credentials, &code)
            .await
            .map_err(SyncError::from_tracking)?;
        info!(operation = "auth", status = "authorized", "Trakt authorization complete");
        self.adopt(service, tokens).await
    }

    /// Persist `tokens` and validate the new access token
    async fn adopt(&mut self, service: &dyn TrackingService, tokens: TokenInfo) -> Result<TraktSession, SyncError> {
        self.store.set_trakt_access_token(tokens.access_token.clone());
        self.store.set_trakt_refresh_token(tokens.refresh_token);
        self.store.set_trakt_token_expires(tokens.expires_at);
        self.store
            .save()
            .map_err(|e| SyncError::Config(format!("failed to save credential store: {:#}", e)))?;

        service
            .authenticate(&self.credentials, &tokens.access_token)
            .await
            .map_err(SyncError::from_tracking)
    }
}
