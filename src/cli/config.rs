//! CLI Configuration.
//!
//! Where the CLI keeps its files and how it prints, with `GEMBITES_*`
//! environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::output::OutputFormat;
use crate::core::config::ProtocolConfig;

/// Name of the CLI configuration file inside the data directory
pub const CLI_CONFIG_FILE: &str = "cli.json";

/// Name of the protocol configuration file inside the data directory
pub const PROTOCOL_CONFIG_FILE: &str = "protocol.json";

/// Name of the key file inside the data directory
pub const KEY_FILE: &str = "key.json";

// ═══════════════════════════════════════════════════════════════════════════════
// CLI CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Data directory
    pub data_dir: PathBuf,
    /// Output format
    pub output_format: OutputFormat,
    /// Protocol configuration file (defaults to `<data_dir>/protocol.json`)
    pub protocol_config: Option<PathBuf>,
    /// Colored terminal output
    pub color: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_format: OutputFormat::Text,
            protocol_config: None,
            color: true,
        }
    }
}

impl CliConfig {
    /// Create with a data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `GEMBITES_*` environment variables on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("GEMBITES_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(format) = std::env::var("GEMBITES_OUTPUT") {
            if let Ok(format) = format.parse() {
                self.output_format = format;
            }
        }

        if let Ok(path) = std::env::var("GEMBITES_PROTOCOL_CONFIG") {
            self.protocol_config = Some(PathBuf::from(path));
        }

        if std::env::var("GEMBITES_NO_COLOR").is_ok() {
            self.color = false;
        }

        self
    }

    /// Path of the CLI configuration file
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CLI_CONFIG_FILE)
    }

    /// Path of the protocol configuration file
    pub fn protocol_config_path(&self) -> PathBuf {
        self.protocol_config
            .clone()
            .unwrap_or_else(|| self.data_dir.join(PROTOCOL_CONFIG_FILE))
    }

    /// Path of the key file
    pub fn key_path(&self) -> PathBuf {
        self.data_dir.join(KEY_FILE)
    }

    /// Protocol configuration from disk, or defaults when no file exists
    pub fn load_protocol_config(&self) -> Result<ProtocolConfig, ConfigError> {
        let path = self.protocol_config_path();
        if !path.exists() {
            return Ok(ProtocolConfig::default());
        }
        ProtocolConfig::load(&path).map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("data directory cannot be empty".into()));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Get default data directory
fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("Gembites");
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".gembites");
        }
    }

    PathBuf::from(".gembites")
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
