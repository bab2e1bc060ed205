//! Command implementations for otactl

pub mod build;
pub mod check;
pub mod config;
pub mod inspect;
pub mod pack;
pub mod verify;

use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use tracing::debug;
use zonal_ota_package_format::{CompressionAlgorithm, PayloadCompressor, ZONAL_MAGIC, compressor_for};
use zonal_ota_update::OtaConfig;

use crate::error::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Destination path
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Load, validate and print a configuration file
    Show {
        /// Configuration file
        path: PathBuf,
    },
}

/// Payload compression selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompressionArg {
    Gzip,
    Zlib,
    None,
}

impl CompressionArg {
    pub fn compressor(self, level: u32) -> Box<dyn PayloadCompressor> {
        let algorithm = match self {
            CompressionArg::Gzip => CompressionAlgorithm::Gzip,
            CompressionArg::Zlib => CompressionAlgorithm::Zlib,
            CompressionArg::None => CompressionAlgorithm::None,
        };
        compressor_for(algorithm, level)
    }
}

/// Package container kinds told apart by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    Single,
    Zonal,
}

impl PackageKind {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&ZONAL_MAGIC) {
            PackageKind::Zonal
        } else {
            PackageKind::Single
        }
    }
}

/// Configuration from `path`, or defaults when no path was given.
pub async fn load_config(path: Option<&Path>) -> Result<OtaConfig, CliError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration");
            OtaConfig::load_from_path(path)
                .await
                .map_err(|e| CliError::Validation(format!("{e:#}")))
        }
        None => Ok(OtaConfig::default()),
    }
}

/// Read a whole package file.
pub async fn read_package(path: &Path) -> Result<Vec<u8>, CliError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| CliError::from_read(path, e))
}
