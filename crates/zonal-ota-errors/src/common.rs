//! Common error types and utilities used across all OTA crates.
//!
//! This module provides the top-level error enum that wraps every domain
//! error, along with error classification and severity levels.

use core::fmt;

use crate::{CampaignError, CodecError, FleetError, PackageError, VersionError};

/// Top-level error type that can wrap all OTA sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum OtaError {
    /// Version parsing and update eligibility errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// ECU registry and firmware repository errors
    #[error("Fleet error: {0}")]
    Fleet(#[from] FleetError),

    /// Binary codec errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Package build and download errors
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Campaign state machine errors
    #[error("Campaign error: {0}")]
    Campaign(#[from] CampaignError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl OtaError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            OtaError::Version(_) => ErrorCategory::Version,
            OtaError::Fleet(_) => ErrorCategory::Fleet,
            OtaError::Codec(_) => ErrorCategory::Codec,
            OtaError::Package(_) => ErrorCategory::Package,
            OtaError::Campaign(_) => ErrorCategory::Campaign,
            OtaError::Io(_) => ErrorCategory::IO,
            OtaError::Config(_) => ErrorCategory::Config,
            OtaError::Other(_) => ErrorCategory::Other,
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OtaError::Version(e) => e.severity(),
            OtaError::Fleet(e) => e.severity(),
            OtaError::Codec(e) => e.severity(),
            OtaError::Package(e) => e.severity(),
            OtaError::Campaign(e) => e.severity(),
            OtaError::Io(_) => ErrorSeverity::Error,
            OtaError::Config(_) => ErrorSeverity::Error,
            OtaError::Other(_) => ErrorSeverity::Error,
        }
    }

    /// Check if this error is recoverable.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }

    /// Create a configuration error with a message.
    pub fn config(msg: impl Into<String>) -> Self {
        OtaError::Config(msg.into())
    }

    /// Create a generic error with a message.
    pub fn other(msg: impl Into<String>) -> Self {
        OtaError::Other(msg.into())
    }
}

impl From<std::io::Error> for OtaError {
    fn from(e: std::io::Error) -> Self {
        OtaError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Version model errors
    Version = 0,
    /// Fleet lookup errors
    Fleet = 1,
    /// Binary codec errors
    Codec = 2,
    /// Package build and download errors
    Package = 3,
    /// Campaign state machine errors
    Campaign = 4,
    /// Configuration errors
    Config = 5,
    /// I/O errors
    IO = 6,
    /// Other errors
    Other = 255,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Version => write!(f, "Version"),
            ErrorCategory::Fleet => write!(f, "Fleet"),
            ErrorCategory::Codec => write!(f, "Codec"),
            ErrorCategory::Package => write!(f, "Package"),
            ErrorCategory::Campaign => write!(f, "Campaign"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::IO => write!(f, "IO"),
            ErrorCategory::Other => write!(f, "Other"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, data integrity may be compromised
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
