use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CATALOG_LIST_URL: &str =
    "https://raw.githubusercontent.com/Fribb/anime-lists/master/anime-list-full.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trakt: TraktConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TraktConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_list_url")]
    pub list_url: String,
    /// Age in days at which the cached anime list is refetched
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Prompt for catalog IDs when a cross-reference lookup misses
    #[serde(default = "default_true")]
    pub interactive: bool,
}

fn default_true() -> bool {
    true
}

fn default_list_url() -> String {
    DEFAULT_CATALOG_LIST_URL.to_string()
}

fn default_max_age_days() -> u32 {
    7
}

fn default_request_timeout_seconds() -> u64 {
    60
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            list_url: default_list_url(),
            max_age_days: default_max_age_days(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { interactive: default_true() }
    }
}

impl TraktConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
            && self.client_id != "YOUR_CLIENT_ID"
            && !self.client_secret.trim().is_empty()
            && self.client_secret != "YOUR_CLIENT_SECRET"
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config, writing out defaults first if no file exists yet
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to_file(path)?;
            return Ok(config);
        }
        Self::load_from_file(path)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.catalog.list_url.trim().is_empty() {
            return Err(anyhow::anyhow!("catalog.list_url cannot be empty"));
        }
        if self.catalog.max_age_days == 0 {
            return Err(anyhow::anyhow!("catalog.max_age_days must be at least 1"));
        }
        if self.catalog.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("catalog.request_timeout_seconds must be at least 1"));
        }
        Ok(())
    }

    pub fn is_trakt_configured(&self) -> bool {
        self.trakt.is_configured()
    }
}
