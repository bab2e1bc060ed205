//! ECU registry and firmware repository lookup errors.

use crate::common::ErrorSeverity;

/// Fleet lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FleetError {
    /// ECU is not registered
    #[error("Unknown ECU: {0}")]
    UnknownEcu(String),

    /// No firmware artifact is registered for an ECU type
    #[error("No firmware registered for ECU type {0}")]
    NoFirmwareForType(String),

    /// Vehicle is not registered
    #[error("Unknown vehicle: {0}")]
    UnknownVehicle(String),

    /// Repository collaborator failed
    #[error("Repository failure: {0}")]
    Repository(String),
}

impl FleetError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FleetError::UnknownEcu(_) => ErrorSeverity::Warning,
            FleetError::NoFirmwareForType(_) => ErrorSeverity::Warning,
            FleetError::UnknownVehicle(_) => ErrorSeverity::Warning,
            FleetError::Repository(_) => ErrorSeverity::Error,
        }
    }

    /// Check if retrying the lookup might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FleetError::Repository(_))
    }

    /// Create a repository failure error.
    pub fn repository(msg: impl Into<String>) -> Self {
        FleetError::Repository(msg.into())
    }
}
