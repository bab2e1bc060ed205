//! Zonal package build, storage and download errors.

use crate::codec::CodecError;
use crate::common::ErrorSeverity;
use crate::fleet::FleetError;

/// Package manager errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackageError {
    /// Building one zone's package failed; sibling zones are unaffected
    #[error("Failed to build package for zone {zone_id}: {reason}")]
    ZonePackageBuildFailed {
        /// Zone identifier
        zone_id: String,
        /// Failure reason
        reason: String,
    },

    /// Firmware bytes do not hash to the registered content hash
    #[error("Firmware digest mismatch for {ecu_id}")]
    DigestMismatch {
        /// ECU whose firmware failed the check
        ecu_id: String,
    },

    /// No built package exists for the campaign and zone
    #[error("No package for campaign {campaign_id}, zone {zone_id}")]
    PackageNotFound {
        /// Campaign identifier
        campaign_id: String,
        /// Zone identifier
        zone_id: String,
    },

    /// Requested byte range lies outside the package
    #[error("Range {start}-{end} not satisfiable for {size} byte package")]
    RangeNotSatisfiable {
        /// First requested byte
        start: u64,
        /// Last requested byte
        end: u64,
        /// Package size
        size: u64,
    },

    /// Range header could not be parsed
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Package storage failed
    #[error("Package storage failure: {0}")]
    Storage(String),

    /// Codec failure while encoding or decoding
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Fleet lookup failure
    #[error(transparent)]
    Fleet(#[from] FleetError),
}

impl PackageError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PackageError::ZonePackageBuildFailed { .. } => ErrorSeverity::Error,
            PackageError::DigestMismatch { .. } => ErrorSeverity::Critical,
            PackageError::PackageNotFound { .. } => ErrorSeverity::Warning,
            PackageError::RangeNotSatisfiable { .. } => ErrorSeverity::Warning,
            PackageError::InvalidRange(_) => ErrorSeverity::Warning,
            PackageError::Storage(_) => ErrorSeverity::Error,
            PackageError::Codec(e) => e.severity(),
            PackageError::Fleet(e) => e.severity(),
        }
    }

    /// Create a zone build failure error.
    pub fn zone_failed(zone_id: impl Into<String>, reason: impl Into<String>) -> Self {
        PackageError::ZonePackageBuildFailed {
            zone_id: zone_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a storage failure error.
    pub fn storage(msg: impl Into<String>) -> Self {
        PackageError::Storage(msg.into())
    }

    /// Create a package not found error.
    pub fn not_found(campaign_id: impl Into<String>, zone_id: impl Into<String>) -> Self {
        PackageError::PackageNotFound {
            campaign_id: campaign_id.into(),
            zone_id: zone_id.into(),
        }
    }
}

impl From<std::io::Error> for PackageError {
    fn from(e: std::io::Error) -> Self {
        PackageError::Storage(e.to_string())
    }
}
