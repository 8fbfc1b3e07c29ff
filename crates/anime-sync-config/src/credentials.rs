use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const TRAKT_ACCESS_TOKEN: &str = "trakt_access_token";
const TRAKT_REFRESH_TOKEN: &str = "trakt_refresh_token";
const TRAKT_TOKEN_EXPIRES: &str = "trakt_token_expires";

#[derive(Debug, Serialize, Deserialize, Default)]
struct CredentialsData {
    #[serde(flatten)]
    data: HashMap<String, String>,
}

/// Flat key/value token store backed by a TOML file
pub struct CredentialStore {
    path: PathBuf,
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            credentials: HashMap::new(),
        }
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            let creds_data: CredentialsData = toml::from_str(&content)?;
            self.credentials = creds_data.data;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let creds_data = CredentialsData {
            data: self.credentials.clone(),
        };
        let content = toml::to_string_pretty(&creds_data)?;
        let temp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.credentials.get(key)
    }

    pub fn set(&mut self, key: String, value: String) {
        self.credentials.insert(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.credentials.remove(key);
    }

    pub fn get_trakt_access_token(&self) -> Option<&String> {
        self.get(TRAKT_ACCESS_TOKEN)
    }

    pub fn set_trakt_access_token(&mut self, token: String) {
        self.set(TRAKT_ACCESS_TOKEN.to_string(), token);
    }

    pub fn get_trakt_refresh_token(&self) -> Option<&String> {
        self.get(TRAKT_REFRESH_TOKEN)
    }

    pub fn set_trakt_refresh_token(&mut self, token: String) {
        self.set(TRAKT_REFRESH_TOKEN.to_string(), token);
    }

    pub fn get_trakt_token_expires(&self) -> Option<DateTime<Utc>> {
        self.get(TRAKT_TOKEN_EXPIRES)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn set_trakt_token_expires(&mut self, expires: DateTime<Utc>) {
        self.set(TRAKT_TOKEN_EXPIRES.to_string(), expires.to_rfc3339());
    }

    /// Forget all Trakt tokens, forcing a fresh authorization
    pub fn clear_trakt_tokens(&mut self) {
        self.remove(TRAKT_ACCESS_TOKEN);
        self.remove(TRAKT_REFRESH_TOKEN);
        self.remove(TRAKT_TOKEN_EXPIRES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_credential_store_load_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");

        let mut store = CredentialStore::new(path.clone());
        store.set_trakt_access_token("test_token".to_string());
        store.set_trakt_refresh_token("test_refresh".to_string());
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        assert_eq!(loaded_store.get_trakt_access_token(), Some(&"test_token".to_string()));
        assert_eq!(loaded_store.get_trakt_refresh_token(), Some(&"test_refresh".to_string()));
    }

    #[test]
    fn test_credential_store_trakt_token_expires() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");

        let mut store = CredentialStore::new(path.clone());
        let expires = Utc::now() + chrono::Duration::hours(1);
        store.set_trakt_token_expires(expires);
        store.save().unwrap();

        let mut loaded_store = CredentialStore::new(path);
        loaded_store.load().unwrap();
        let loaded_expires = loaded_store.get_trakt_token_expires().unwrap();
        // Allow 1 second difference for serialization
        assert!((loaded_expires - expires).num_seconds().abs() < 2);
    }

    #[test]
    fn test_clear_trakt_tokens() {
        let mut store = CredentialStore::new(PathBuf::from("/tmp/unused"));
        store.set_trakt_access_token("a".to_string());
        store.set_trakt_refresh_token("r".to_string());
        store.set("other".to_string(), "kept".to_string());

        store.clear_trakt_tokens();
        assert!(store.get_trakt_access_token().is_none());
        assert!(store.get_trakt_refresh_token().is_none());
        assert_eq!(store.get("other"), Some(&"kept".to_string()));
    }
}
