//! Configuration loading for the queue service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::message::ActorRole;
use crate::error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Environment variable naming the settings file.
pub const CONFIG_PATH_ENV: &str = "QUEUE_CONFIG_PATH";

/// Settings file used when the environment variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

const SUPPORTED_JWT_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Load settings from `path`. A missing file yields defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid settings in {}: {}", path.display(), e)))?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.max_messages_per_queue == 0 {
        return Err(Error::Config(
            "max_messages_per_queue must be at least 1".to_string(),
        ));
    }
    if settings.persist_interval_seconds == 0 {
        return Err(Error::Config(
            "persist_interval_seconds must be at least 1".to_string(),
        ));
    }
    if !SUPPORTED_JWT_ALGORITHMS.contains(&settings.jwt_algorithm.as_str()) {
        return Err(Error::Config(format!(
            "jwt_algorithm '{}' is not supported (use one of {})",
            settings.jwt_algorithm,
            SUPPORTED_JWT_ALGORITHMS.join(", ")
        )));
    }
    Ok(())
}

/// A login account for the token endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserConfig {
    pub password: String,
    pub role: ActorRole,
}

fn default_max_messages() -> usize {
    crate::core::DEFAULT_CAPACITY
}

fn default_persist_interval() -> u64 {
    60
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./queue_data")
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    7500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_jwt_secret() -> String {
    "your-secret-key-change-in-production".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_jwt_expiration() -> u64 {
    30
}

fn default_users() -> HashMap<String, UserConfig> {
    [
        ("admin", "admin_password", ActorRole::Admin),
        ("agent", "agent_password", ActorRole::Agent),
        ("user", "user_password", ActorRole::User),
    ]
    .into_iter()
    .map(|(name, password, role)| {
        (
            name.to_string(),
            UserConfig {
                password: password.to_string(),
                role,
            },
        )
    })
    .collect()
}

/// Queue service settings.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Settings {
    /// Capacity of queues created without an explicit one.
    #[serde(default = "default_max_messages")]
    pub max_messages_per_queue: usize,

    #[serde(default = "default_persist_interval")]
    pub persist_interval_seconds: u64,

    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log directory; the platform data directory when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret_key: String,

    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,

    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_minutes: u64,

    #[serde(default = "default_users")]
    pub users: HashMap<String, UserConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_messages_per_queue: default_max_messages(),
            persist_interval_seconds: default_persist_interval(),
            storage_path: default_storage_path(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: None,
            jwt_secret_key: default_jwt_secret(),
            jwt_algorithm: default_jwt_algorithm(),
            jwt_expiration_minutes: default_jwt_expiration(),
            users: default_users(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = load_settings_from(&temp_dir.path().join("config.json")).unwrap();

        assert_eq!(settings.max_messages_per_queue, 1000);
        assert_eq!(settings.persist_interval_seconds, 60);
        assert_eq!(settings.port, 7500);
        assert_eq!(settings.users["agent"].role, ActorRole::Agent);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_messages_per_queue": 5, "storage_path": "/tmp/q"}"#).unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.max_messages_per_queue, 5);
        assert_eq!(settings.storage_path, PathBuf::from("/tmp/q"));
        assert_eq!(settings.jwt_algorithm, "HS256");
        assert_eq!(settings.users.len(), 3);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        std::fs::write(&path, r#"{"persist_interval_seconds": 0}"#).unwrap();
        assert!(matches!(load_settings_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, r#"{"jwt_algorithm": "RS256"}"#).unwrap();
        assert!(matches!(load_settings_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(Error::Config(_))));
    }
}
