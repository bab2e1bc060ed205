//! Configuration for the OTA core
//!
//! One explicit value, passed into each component's constructor. JSON on
//! disk; a missing file is created with defaults on first load.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zonal_ota_package_format::{CompressionAlgorithm, PayloadCompressor, compressor_for};

use crate::version_manager::VersionPolicy;

/// Current configuration schema.
pub const CONFIG_SCHEMA: &str = "zonal-ota.config/1";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaConfig {
    pub schema_version: String,
    #[serde(default)]
    pub version_policy: VersionPolicy,
    #[serde(default)]
    pub packaging: PackagingConfig,
    #[serde(default)]
    pub campaigns: CampaignConfig,
}

/// Package build settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingConfig {
    /// Directory receiving package files and campaign metadata
    pub storage_dir: PathBuf,
    pub compression: CompressionConfig,
    /// Maximum zone packages built at once
    pub zone_build_concurrency: usize,
    /// When false every target goes into a single package under zone `ALL`
    pub zonal_optimization: bool,
}

/// Payload compression settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub algorithm: CompressionKind,
    pub level: u32,
}

/// Configurable compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    #[default]
    Gzip,
    Zlib,
}

impl CompressionKind {
    pub fn algorithm(self) -> CompressionAlgorithm {
        match self {
            CompressionKind::Gzip => CompressionAlgorithm::Gzip,
            CompressionKind::Zlib => CompressionAlgorithm::Zlib,
        }
    }
}

impl CompressionConfig {
    /// Compressor honouring `enabled`; a pass-through one when disabled.
    pub fn compressor(&self) -> Box<dyn PayloadCompressor> {
        if self.enabled {
            compressor_for(self.algorithm.algorithm(), self.level)
        } else {
            compressor_for(CompressionAlgorithm::None, 0)
        }
    }
}

/// Campaign coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Rollback setting for campaigns that do not specify one
    pub rollback_enabled_default: bool,
    /// Prefix for per-zone download endpoints sent to vehicles
    pub download_base_url: String,
    /// Lifetime of a download session
    pub download_token_ttl_secs: u64,
    /// Rollback window advertised to vehicles
    pub rollback_timeout_secs: u64,
}

impl Default for OtaConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA.to_string(),
            version_policy: VersionPolicy::default(),
            packaging: PackagingConfig::default(),
            campaigns: CampaignConfig::default(),
        }
    }
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("ota_packages"),
            compression: CompressionConfig::default(),
            zone_build_concurrency: 4,
            zonal_optimization: true,
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: CompressionKind::Gzip,
            level: 6,
        }
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            rollback_enabled_default: true,
            download_base_url: "https://ota.example.invalid".to_string(),
            download_token_ttl_secs: 3600,
            rollback_timeout_secs: 300,
        }
    }
}

impl OtaConfig {
    /// Load configuration from `path`, writing defaults there if it is missing.
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = ?path, "Config file not found, creating default");
            let config = Self::default();
            config.save_to_path(path).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {path:?}"))?;

        let config: OtaConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        config.validate()?;

        debug!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub async fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file: {path:?}"))?;

        debug!(path = ?path, "Saved config");
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.schema_version != CONFIG_SCHEMA {
            anyhow::bail!("Invalid schema version: {}", self.schema_version);
        }

        let policy = &self.version_policy;
        if policy.max_priority > 3 {
            anyhow::bail!("Invalid max priority: {} (0-3)", policy.max_priority);
        }
        if policy.check_concurrency == 0 {
            anyhow::bail!("Version check concurrency must be at least 1");
        }

        if self.packaging.zone_build_concurrency == 0 {
            anyhow::bail!("Zone build concurrency must be at least 1");
        }
        if self.packaging.compression.level > 9 {
            anyhow::bail!(
                "Invalid compression level: {} (0-9)",
                self.packaging.compression.level
            );
        }
        if self.packaging.storage_dir.as_os_str().is_empty() {
            anyhow::bail!("Package storage directory must not be empty");
        }

        Ok(())
    }
}
