//! Version parsing and update eligibility errors.
//!
//! These are validation errors: they are reported synchronously to the caller
//! and never retried automatically.

use crate::common::ErrorSeverity;

/// Version model errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Version string does not match `major.minor.patch`
    #[error("Invalid version format: '{0}' (expected MAJOR.MINOR.PATCH)")]
    InvalidVersionFormat(String),

    /// `latest` was asked for the maximum of an empty set
    #[error("Cannot select the latest version of an empty version set")]
    EmptyVersionSet,

    /// ECU identifier is malformed or out of range
    #[error("Invalid ECU id: '{0}' (expected ECU_001..ECU_100)")]
    InvalidEcuId(String),

    /// ECU is not in the active state
    #[error("ECU {ecu_id} is not active (status: {status})")]
    EcuNotActive {
        /// ECU identifier
        ecu_id: String,
        /// Current status
        status: String,
    },

    /// Target version is not strictly greater than the installed one
    #[error("Target version {target} is not newer than current version {current}")]
    TargetNotNewer {
        /// Installed version
        current: String,
        /// Requested version
        target: String,
    },

    /// Target major version is lower than the installed one
    #[error("Major version downgrade rejected: {current} -> {target}")]
    MajorDowngradeRejected {
        /// Installed version
        current: String,
        /// Requested version
        target: String,
    },
}

impl VersionError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VersionError::InvalidVersionFormat(_) => ErrorSeverity::Error,
            VersionError::EmptyVersionSet => ErrorSeverity::Error,
            VersionError::InvalidEcuId(_) => ErrorSeverity::Error,
            VersionError::EcuNotActive { .. } => ErrorSeverity::Warning,
            VersionError::TargetNotNewer { .. } => ErrorSeverity::Info,
            VersionError::MajorDowngradeRejected { .. } => ErrorSeverity::Warning,
        }
    }

    /// Check if this error rejects an update attempt rather than malformed input.
    pub fn is_update_rejection(&self) -> bool {
        matches!(
            self,
            VersionError::EcuNotActive { .. }
                | VersionError::TargetNotNewer { .. }
                | VersionError::MajorDowngradeRejected { .. }
        )
    }

    /// Create an invalid version format error.
    pub fn invalid_format(input: impl Into<String>) -> Self {
        VersionError::InvalidVersionFormat(input.into())
    }

    /// Create an invalid ECU id error.
    pub fn invalid_ecu_id(input: impl Into<String>) -> Self {
        VersionError::InvalidEcuId(input.into())
    }

    /// Create an ECU not active error.
    pub fn not_active(ecu_id: impl Into<String>, status: impl Into<String>) -> Self {
        VersionError::EcuNotActive {
            ecu_id: ecu_id.into(),
            status: status.into(),
        }
    }
}
