pub mod crypto;
pub mod paths;
pub mod settings;

pub use paths::PathManager;
pub use settings::Settings;

/// Load environment variables from .env files.
/// First loads from ~/.env (home directory), then from ./.env (project directory).
/// Values already present in the process environment are never overwritten,
/// so ~/.env wins over ./.env for keys both define.
/// Call this before parsing CLI args so `env = "..."` flags can see the values.
pub fn load_env_file() {
    if let Some(home) = dirs::home_dir() {
        let home_env_path = home.join(".env");
        dotenv::from_path(home_env_path).ok();
    }

    dotenv::dotenv().ok();
}
