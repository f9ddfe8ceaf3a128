//! Configuration Module - User preferences from config.toml
//!
//! Supports:
//! - Container marker (text or hex)
//! - Location of the signature table
//! - Confirmation prompts for destructive edits
//! - Extraction defaults

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::container::Marker;

/// File name of the signature table, looked up beside the config file
pub const SIGNATURES_FILE: &str = "signatures.json";

/// rpa-splice configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Container layout
    pub container: ContainerConfig,
    /// Signature table
    pub signatures: SignaturesConfig,
    /// Edit safety
    pub edit: EditConfig,
    /// Extraction settings
    pub extract: ExtractConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Marker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Marker as text
    pub marker: String,
    /// Marker as hex; wins over `marker` when set
    pub marker_hex: Option<String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            marker: String::from_utf8_lossy(crate::container::RENPY_MARKER).into_owned(),
            marker_hex: None,
        }
    }
}

/// Signature table location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturesConfig {
    /// Path to a signatures JSON file (default: beside config.toml)
    pub path: Option<PathBuf>,
}

/// Confirmation prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Ask before replacing a chunk with one of a different size
    pub confirm_size_change: bool,
    /// Ask before deleting chunks
    pub confirm_delete: bool,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            confirm_size_change: true,
            confirm_delete: true,
        }
    }
}

/// Extraction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Write manifest.json with blake3 hashes by default
    pub create_manifest: bool,
    /// Default destination directory
    pub default_dest: Option<PathBuf>,
}

impl Config {
    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tunclon", "rpa-splice")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".rpa-splice")
                    .join("config.toml")
            })
    }

    /// Create default config file if it doesn't exist
    pub fn ensure_exists() -> Result<PathBuf> {
        let path = Self::default_path();
        if !path.exists() {
            fs::create_dir_all(path.parent().unwrap_or_else(|| Path::new(".")))?;
            fs::write(&path, generate_sample_config())
                .with_context(|| format!("Failed to write config: {}", path.display()))?;
            tracing::info!("Created default config at {}", path.display());
        }
        Ok(path)
    }

    /// Build the configured marker
    pub fn resolve_marker(&self) -> Result<Marker> {
        let marker = match &self.container.marker_hex {
            Some(hex) => Marker::from_hex(hex),
            None => Marker::new(self.container.marker.as_bytes().to_vec()),
        };
        marker.context("Invalid container marker in config")
    }

    /// Signature table path: explicit setting, else beside `config_path`
    pub fn signatures_path(&self, config_path: &Path) -> PathBuf {
        self.signatures.path.clone().unwrap_or_else(|| {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(SIGNATURES_FILE)
        })
    }
}

/// Generate a sample config file with comments
pub fn generate_sample_config() -> String {
    r#"# rpa-splice Configuration
# Location: ~/.config/rpa-splice/config.toml (or %APPDATA%\tunclon\rpa-splice\config\config.toml on Windows)

[general]
# Log level: trace, debug, info, warn, error
log_level = "info"

[container]
# Byte sequence separating chunks, as text
marker = "Made with Ren'Py."

# Or as hex (takes precedence over `marker`)
# marker_hex = "4D61646520776974682052656E2750792E"

[signatures]
# Signature table (default: signatures.json beside this file)
# path = "/home/user/.config/rpa-splice/signatures.json"

[edit]
# Ask before replacing a chunk with one of a different size
confirm_size_change = true

# Ask before deleting chunks
confirm_delete = true

[extract]
# Write manifest.json with blake3 hashes
create_manifest = false

# Default destination for extraction (optional)
# default_dest = "/home/user/Extracted"
"#
    .to_string()
}
