use crate::output::Output;
use anime_sync_core::ResolutionGateway;
use anime_sync_sources::TraktCredentials;
use color_eyre::Result;
use dialoguer::{Confirm, Input, Password};
use tracing::warn;

const TRAKT_APPLICATIONS_URL: &str = "https://trakt.tv/oauth/applications";

/// Prompt for a string value with optional default
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input_builder = Input::<String>::new().with_prompt(prompt).allow_empty(true);

    if let Some(default_value) = default {
        input_builder = input_builder.default(default_value.to_string());
    }

    input_builder
        .interact_text()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt for a secret (masked input)
pub fn prompt_password(prompt: &str) -> Result<String> {
    Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read password: {}", e))
}

/// Prompt for yes/no with a default
pub fn prompt_yes_no(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}

/// Split a comma or whitespace separated list of numeric catalog IDs.
/// Empty input is `Ok(vec![])`; any non-numeric token is an error.
pub fn parse_catalog_ids(input: &str) -> std::result::Result<Vec<String>, String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token.chars().all(|c| c.is_ascii_digit()) {
                Ok(token.to_string())
            } else {
                Err(format!("'{}' is not a MyAnimeList ID", token))
            }
        })
        .collect()
}

/// Asks the operator on the terminal. Prompt failures (closed stdin,
/// interrupted input) count as declining.
pub struct TerminalGateway<'a> {
    output: &'a Output,
    ask_catalog_ids: bool,
}

impl<'a> TerminalGateway<'a> {
    pub fn new(output: &'a Output, ask_catalog_ids: bool) -> Self {
        Self {
            output,
            ask_catalog_ids,
        }
    }

    fn declined<T>(&self, what: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Prompt for {} failed: {}", what, e);
                None
            }
        }
    }
}

impl ResolutionGateway for TerminalGateway<'_> {
    fn prompt_manual_ids(&mut self, title: &str) -> Option<Vec<String>> {
        if !self.ask_catalog_ids {
            return None;
        }

        self.output
            .warn(format!("No MyAnimeList entry found for '{}'", title));
        loop {
            let input = self.declined(
                "catalog IDs",
                prompt_string("MyAnimeList IDs, comma separated (empty to skip)", None),
            )?;
            match parse_catalog_ids(&input) {
                Ok(ids) if ids.is_empty() => return None,
                Ok(ids) => return Some(ids),
                Err(e) => self.output.error(format!("Validation error: {}", e)),
            }
        }
    }

    fn prompt_ignore(&mut self, title: &str) -> bool {
        if !self.ask_catalog_ids {
            return false;
        }

        self.declined(
            "ignore",
            prompt_yes_no(&format!("Ignore '{}' from now on?", title), false),
        )
        .unwrap_or(false)
    }

    fn prompt_credentials(&mut self) -> Option<TraktCredentials> {
        self.output.info("Trakt API credentials are not configured.");
        self.output.info(format!(
            "Create an application at {} and enter its credentials.",
            TRAKT_APPLICATIONS_URL
        ));

        let client_id = self.declined("client ID", prompt_string("Trakt Client ID", None))?;
        let client_secret = self.declined("client secret", prompt_password("Trakt Client Secret"))?;
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            self.output.error("Client ID and Client Secret are required");
            return None;
        }

        Some(TraktCredentials {
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
        })
    }

    fn prompt_authorization_code(&mut self, authorize_url: &str) -> Option<String> {
        self.output.info("Trakt authorization required.");
        self.output
            .info(format!("Open this URL in your browser and approve access:\n  {}", authorize_url));

        let code = self.declined("authorization code", prompt_string("Authorization code", None))?;
        let code = code.trim();
        if code.is_empty() {
            None
        } else {
            Some(code.to_string())
        }
    }
}
