//! Error types for otactl

use thiserror::Error;
use zonal_ota_errors::{ErrorCategory, OtaError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Campaign {campaign_id} built with {failed} failed zone(s)")]
    BuildIncomplete { campaign_id: String, failed: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] OtaError),
}

impl CliError {
    /// Map a read failure on `path` to `NotFound` when the file is missing.
    pub fn from_read(path: &std::path::Path, e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            CliError::NotFound(path.display().to_string())
        } else {
            CliError::Io(e)
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::NotFound(_) => 2,
            CliError::InvalidPackage(_) => 3,
            CliError::Validation(_) | CliError::Json(_) | CliError::Manifest(_) => 4,
            CliError::BuildIncomplete { .. } => 5,
            CliError::Io(_) => 1,
            CliError::Core(e) => match e.category() {
                ErrorCategory::Codec => 3,
                ErrorCategory::Version | ErrorCategory::Config => 4,
                _ => 1,
            },
        }
    }
}
