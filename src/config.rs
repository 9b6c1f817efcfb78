//! Application configuration
//!
//! Persistent configuration stored as JSON. A missing or empty file yields the
//! defaults, so a fresh install needs no setup.

use crate::{session::SessionPolicy, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which storage backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendChoice {
    /// Relational on native platforms, key/value on the web
    #[default]
    Auto,
    /// Always SQLite
    Relational,
    /// Always the key/value store
    KeyValue,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Backend selection
    pub backend: BackendChoice,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Key/value store file
    pub kv_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            database_path: PathBuf::from("./app_data/reparapp.db"),
            kv_path: PathBuf::from("./app_data/reparapp_kv.json"),
        }
    }
}

/// Application configuration
///
/// # Example
/// ```rust,no_run
/// use reparapp::config::Config;
///
/// let mut config = Config::load("reparapp.json").expect("Failed to load");
/// config.clear_session_on_launch = false;
/// config.save("reparapp.json").expect("Failed to save");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sign out any persisted session before listening for auth events
    pub clear_session_on_launch: bool,
    /// Storage configuration
    pub storage: StorageSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clear_session_on_launch: true,
            storage: StorageSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Returns the defaults if the file doesn't exist or is empty.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&data).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Launch policy for the session controller
    pub fn session_policy(&self) -> SessionPolicy {
        SessionPolicy {
            clear_session_on_launch: self.clear_session_on_launch,
        }
    }
}
