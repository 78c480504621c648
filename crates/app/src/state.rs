use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "sealdrop";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PAYLOAD_FILE_NAME: &str = "payload.abp";
pub const PRIVATE_KEY_FILE_NAME: &str = "private.pem";
pub const PUBLIC_KEY_FILE_NAME: &str = "public.pem";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Payload file name used by `send -o` when no name is given
    #[serde(default = "default_payload_file_name")]
    pub payload_file_name: String,
    /// Default log level, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily rolling log files (stderr only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Where `receive` writes decrypted files (working directory if not set)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_payload_file_name() -> String {
    DEFAULT_PAYLOAD_FILE_NAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            payload_file_name: default_payload_file_name(),
            log_level: default_log_level(),
            log_dir: None,
            output_dir: None,
        }
    }
}

impl AppConfig {
    /// Get the sealdrop directory path (custom or default ~/.sealdrop)
    pub fn config_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Load the config file, falling back to defaults when there is none
    ///
    /// Unlike a missing file, a config file that exists but does not parse is
    /// an error.
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let config_path = match Self::config_dir(custom_path) {
            Ok(dir) => dir.join(CONFIG_FILE_NAME),
            // no home and no override, nothing to load
            Err(StateError::NoHomeDirectory) => return Ok(Self::default()),
            Err(e) => return Err(e),
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;
        Ok(config)
    }

    /// Resolve the log level, treating an unknown name as `info`
    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
