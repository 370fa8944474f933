//! Application settings management

use crate::PathManager;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional overrides stored in settings.toml.
/// Every field falls back to the `PathManager` default or the public API endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    /// Path to the OAuth client secrets JSON
    pub client_secrets_path: Option<PathBuf>,
    /// Path to the cached token file
    pub token_path: Option<PathBuf>,
    /// Base URL of the Photos Library REST API (e.g. "https://photoslibrary.googleapis.com/v1")
    pub api_base_url: Option<String>,
    /// URL the raw image bytes are posted to
    pub upload_url: Option<String>,
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from a specific file; unreadable or invalid files yield defaults
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };

        toml::from_str(&content).unwrap_or_default()
    }

    /// Client secrets path, falling back to the default location
    pub fn resolved_client_secrets_path(&self) -> Option<PathBuf> {
        self.client_secrets_path
            .clone()
            .or_else(PathManager::client_secrets_path)
    }

    /// Token cache path, falling back to the default location
    pub fn resolved_token_path(&self) -> Option<PathBuf> {
        self.token_path.clone().or_else(PathManager::token_path)
    }
}
