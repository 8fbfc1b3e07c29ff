//! In-memory collaborators for tests.

use anime_sync_models::{MediaKind, RawCatalogRecord, WatchedItem};
use anime_sync_sources::{
    CatalogListSource, SourceError, TokenInfo, TrackingService, TraktCredentials, TraktSession,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::gateway::ResolutionGateway;

/// Trakt stand-in with a token table and canned watch history
#[derive(Default)]
pub struct FakeTrakt {
    valid_tokens: Mutex<HashSet<String>>,
    refresh_token: Mutex<Option<String>>,
    issued: AtomicUsize,
    refreshes: AtomicUsize,
    shows: Mutex<Vec<WatchedItem>>,
    movies: Mutex<Vec<WatchedItem>>,
    genres: Mutex<HashMap<String, Vec<String>>>,
    genre_calls: Mutex<Vec<String>>,
    /// Revoke every token when the genre call count reaches this value
    revoke_at_genre_call: Mutex<Option<usize>>,
    /// Feeds whose listing answers with a server error
    failing_feeds: Mutex<HashSet<MediaKind>>,
}

impl FakeTrakt {
    pub const AUTH_CODE: &'static str = "let-me-in";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: &str) -> Self {
        self.valid_tokens.lock().unwrap().insert(token.to_string());
        self
    }

    pub fn with_refresh(self, refresh_token: &str) -> Self {
        *self.refresh_token.lock().unwrap() = Some(refresh_token.to_string());
        self
    }

    pub fn with_genres(self, slug: &str, genres: &[&str]) -> Self {
        self.genres
            .lock()
            .unwrap()
            .insert(slug.to_string(), genres.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn set_shows(&self, shows: Vec<WatchedItem>) {
        *self.shows.lock().unwrap() = shows;
    }

    pub fn set_movies(&self, movies: Vec<WatchedItem>) {
        *self.movies.lock().unwrap() = movies;
    }

    pub fn revoke_at_genre_call(&self, call: usize) {
        *self.revoke_at_genre_call.lock().unwrap() = Some(call);
    }

    pub fn fail_listing(&self, kind: MediaKind) {
        self.failing_feeds.lock().unwrap().insert(kind);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn genre_calls(&self) -> Vec<String> {
        self.genre_calls.lock().unwrap().clone()
    }

    fn issue(&self) -> TokenInfo {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access_token = format!("access-{}", n);
        let refresh_token = format!("refresh-{}", n);
        self.valid_tokens.lock().unwrap().insert(access_token.clone());
        *self.refresh_token.lock().unwrap() = Some(refresh_token.clone());
        TokenInfo {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::days(90),
        }
    }

    fn check(&self, session: &TraktSession) -> Result<(), SourceError> {
        if self.valid_tokens.lock().unwrap().contains(&session.access_token) {
            Ok(())
        } else {
            Err(SourceError::Auth("invalid access token".to_string()))
        }
    }

    fn check_listing(&self, kind: MediaKind) -> Result<(), SourceError> {
        if self.failing_feeds.lock().unwrap().contains(&kind) {
            Err(SourceError::from_status(kind.plural(), 503, "service unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TrackingService for FakeTrakt {
    fn authorize_url(&self, credentials: &TraktCredentials) -> String {
        format!("https://trakt.test/oauth/authorize?client_id={}", credentials.client_id)
    }

    async fn exchange_code(&self, _credentials: &TraktCredentials, code: &str) -> Result<TokenInfo, SourceError> {
        if code == Self::AUTH_CODE {
            Ok(self.issue())
        } else {
            Err(SourceError::Auth("invalid code".to_string()))
        }
    }

    async fn refresh_token(
        &self,
        _credentials: &TraktCredentials,
        refresh_token: &str,
    ) -> Result<TokenInfo, SourceError> {
        let expected = self.refresh_token.lock().unwrap().clone();
        if expected.as_deref() == Some(refresh_token) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(self.issue())
        } else {
            Err(SourceError::Auth("invalid refresh token".to_string()))
        }
    }

    async fn authenticate(
        &self,
        credentials: &TraktCredentials,
        access_token: &str,
    ) -> Result<TraktSession, SourceError> {
        let session = TraktSession {
            access_token: access_token.to_string(),
            client_id: credentials.client_id.clone(),
            encoded_username: "me".to_string(),
        };
        self.check(&session)?;
        Ok(session)
    }

    async fn list_watched_shows(&self, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError> {
        self.check(session)?;
        self.check_listing(MediaKind::Show)?;
        Ok(self.shows.lock().unwrap().clone())
    }

    async fn list_watched_movies(&self, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError> {
        self.check(session)?;
        self.check_listing(MediaKind::Movie)?;
        Ok(self.movies.lock().unwrap().clone())
    }

    async fn get_genres(
        &self,
        session: &TraktSession,
        _kind: MediaKind,
        external_id: &str,
    ) -> Result<Vec<String>, SourceError> {
        let call = {
            let mut calls = self.genre_calls.lock().unwrap();
            calls.push(external_id.to_string());
            calls.len()
        };
        if *self.revoke_at_genre_call.lock().unwrap() == Some(call) {
            self.valid_tokens.lock().unwrap().clear();
        }
        self.check(session)?;
        Ok(self
            .genres
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Bulk list stand-in; `None` simulates an unreachable host
pub struct FakeCatalogList {
    records: Mutex<Option<Vec<RawCatalogRecord>>>,
    calls: AtomicUsize,
}

impl FakeCatalogList {
    pub fn new(records: serde_json::Value) -> Self {
        Self {
            records: Mutex::new(Some(serde_json::from_value(records).unwrap())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn go_offline(&self) {
        *self.records.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogListSource for FakeCatalogList {
    async fn fetch_bulk_list(&self, _url: &str) -> Result<Vec<RawCatalogRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::Decode("host unreachable".to_string()))
    }
}

/// Declines every question except the authorization code
pub struct AuthCodeGateway {
    code: String,
    pub urls: Vec<String>,
}

impl AuthCodeGateway {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            urls: Vec::new(),
        }
    }
}

impl ResolutionGateway for AuthCodeGateway {
    fn prompt_manual_ids(&mut self, _title: &str) -> Option<Vec<String>> {
        None
    }

    fn prompt_ignore(&mut self, _title: &str) -> bool {
        false
    }

    fn prompt_credentials(&mut self) -> Option<TraktCredentials> {
        None
    }

    fn prompt_authorization_code(&mut self, authorize_url: &str) -> Option<String> {
        self.urls.push(authorize_url.to_string());
        Some(self.code.clone())
    }
}
