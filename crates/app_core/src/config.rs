//! Application configuration

use app_fs::ReadLimits;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilerConfig {
    pub general: GeneralConfig,
    pub fs: FsConfig,
}

/// Which filesystem backend the process runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentMode {
    /// Real OS filesystem
    #[default]
    #[serde(rename = "production")]
    Production,
    /// In-memory fixture tree
    #[serde(rename = "development")]
    Development,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub mode: DeploymentMode,
    pub log_retention_days: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            mode: DeploymentMode::Production,
            log_retention_days: 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Bytes per preview chunk
    pub read_chunk_size: usize,
    /// Chunks read before a preview is marked as omitted
    pub max_read_chunks: usize,
    pub watch_debounce_ms: u64,
    /// Ask before create, duplicate and rename
    pub confirm_operations: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        let limits = ReadLimits::default();
        Self {
            read_chunk_size: limits.chunk_size,
            max_read_chunks: limits.max_chunks,
            watch_debounce_ms: 100,
            confirm_operations: true,
        }
    }
}

impl FsConfig {
    pub fn read_limits(&self) -> ReadLimits {
        ReadLimits {
            chunk_size: self.read_chunk_size.max(1),
            max_chunks: self.max_read_chunks.max(1),
        }
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }
}

impl FilerConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `config_path`, defaults if it does not exist
    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "Filer", "Filer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}
