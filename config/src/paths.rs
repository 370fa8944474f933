use directories::BaseDirs;
use std::path::PathBuf;
use std::sync::OnceLock;

static CONFIG_DIR_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

const APP_DIR_NAME: &str = "photos-upload";

pub struct PathManager;

impl PathManager {
    /// Set a custom config directory (e.g. from `--config-dir`).
    /// Only the first call has an effect.
    pub fn set_config_dir(path: PathBuf) {
        let _ = CONFIG_DIR_OVERRIDE.set(path);
    }

    pub fn config_dir() -> Option<PathBuf> {
        if let Some(d) = CONFIG_DIR_OVERRIDE.get() {
            return Some(d.clone());
        }
        BaseDirs::new().map(|d| d.config_dir().join(APP_DIR_NAME))
    }

    /// OAuth client secrets downloaded from the Google Cloud console
    pub fn client_secrets_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("client_secret.json"))
    }

    /// Cached access/refresh tokens
    pub fn token_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("token.json"))
    }

    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.toml"))
    }

    pub fn ensure_dirs_exist() -> std::io::Result<()> {
        if let Some(d) = Self::config_dir() {
            std::fs::create_dir_all(&d)?;
        }
        Ok(())
    }
}
