use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::trakt::TraktCredentials;

const REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const TOKEN_URL: &str = "https://api.trakt.tv/oauth/token";
const AUTHORIZE_URL: &str = "https://trakt.tv/oauth/authorize";

/// Create a reqwest Client with browser-like headers to bypass Cloudflare
pub fn create_trakt_client() -> Client {
    Client::builder()
        .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn authorize_url(client_id: &str) -> String {
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        REDIRECT_URI
    )
}

pub async fn exchange_code(
    client: &Client,
    credentials: &TraktCredentials,
    code: &str,
) -> Result<TokenInfo, SourceError> {
    let payload = serde_json::json!({
        "code": code.trim(),
        "client_id": credentials.client_id,
        "client_secret": credentials.client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "authorization_code"
    });
    request_token(client, &payload, "authorization code exchange").await
}

pub async fn refresh_access_token(
    client: &Client,
    credentials: &TraktCredentials,
    refresh_token: &str,
) -> Result<TokenInfo, SourceError> {
    let payload = serde_json::json!({
        "refresh_token": refresh_token,
        "client_id": credentials.client_id,
        "client_secret": credentials.client_secret,
        "redirect_uri": REDIRECT_URI,
        "grant_type": "refresh_token"
    });
    request_token(client, &payload, "token refresh").await
}

async fn request_token(
    client: &Client,
    payload: &serde_json::Value,
    what: &str,
) -> Result<TokenInfo, SourceError> {
    let response = client
        .post(TOKEN_URL)
        .json(payload)
        .header("Accept", "application/json")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Content-Type", "application/json")
        .header("Origin", "https://trakt.tv")
        .header("Referer", "https://trakt.tv/")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        // The token endpoint answers 400/401 for bad codes and revoked refresh tokens
        return Err(match status.as_u16() {
            400 | 401 | 403 => SourceError::Auth(format!("{} rejected: {} {}", what, status, error_text)),
            code => SourceError::from_status(what, code, error_text),
        });
    }

    let token_response: TokenResponse = response.json().await?;
    Ok(token_info(token_response, Utc::now()))
}

/// Expiry is pulled in by two minutes so a token is never used at the edge
fn token_info(response: TokenResponse, now: DateTime<Utc>) -> TokenInfo {
    TokenInfo {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at: now + Duration::seconds(response.expires_in as i64 - 120),
    }
}
