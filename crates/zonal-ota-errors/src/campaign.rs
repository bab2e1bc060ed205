//! Campaign deployment state machine errors.
//!
//! State-machine violations are reported to the caller and never leave a
//! partial transition behind.

use crate::common::ErrorSeverity;

/// Campaign coordinator errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CampaignError {
    /// No deployment record exists for the campaign and vehicle
    #[error("Unknown deployment target: campaign {campaign_id}, vehicle {vin}")]
    UnknownDeploymentTarget {
        /// Campaign identifier
        campaign_id: String,
        /// Vehicle identification number
        vin: String,
    },

    /// Event is not allowed in the record's current state
    #[error("Invalid transition for campaign {campaign_id}, vehicle {vin}: {event} in state {from}")]
    InvalidTransition {
        /// Campaign identifier
        campaign_id: String,
        /// Vehicle identification number
        vin: String,
        /// Current state
        from: String,
        /// Rejected event
        event: String,
    },

    /// Campaign is not registered
    #[error("Unknown campaign: {0}")]
    UnknownCampaign(String),

    /// Campaign id is already registered
    #[error("Campaign already exists: {0}")]
    CampaignExists(String),

    /// Rollback requested on a campaign created without rollback
    #[error("Rollback is disabled for campaign {0}")]
    RollbackDisabled(String),

    /// The record changed between read and conditional update
    #[error("Concurrent modification of deployment {campaign_id}/{vin}")]
    ConcurrentModification {
        /// Campaign identifier
        campaign_id: String,
        /// Vehicle identification number
        vin: String,
    },

    /// Outbound vehicle notification failed
    #[error("Vehicle notification failed: {0}")]
    Notification(String),

    /// Deployment repository failed
    #[error("Deployment repository failure: {0}")]
    Repository(String),
}

impl CampaignError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CampaignError::UnknownDeploymentTarget { .. } => ErrorSeverity::Warning,
            CampaignError::InvalidTransition { .. } => ErrorSeverity::Warning,
            CampaignError::UnknownCampaign(_) => ErrorSeverity::Warning,
            CampaignError::CampaignExists(_) => ErrorSeverity::Warning,
            CampaignError::RollbackDisabled(_) => ErrorSeverity::Warning,
            CampaignError::ConcurrentModification { .. } => ErrorSeverity::Error,
            CampaignError::Notification(_) => ErrorSeverity::Error,
            CampaignError::Repository(_) => ErrorSeverity::Error,
        }
    }

    /// Check if this error is a state-machine violation that left state untouched.
    pub fn is_state_violation(&self) -> bool {
        matches!(
            self,
            CampaignError::UnknownDeploymentTarget { .. } | CampaignError::InvalidTransition { .. }
        )
    }

    /// Create an unknown deployment target error.
    pub fn unknown_target(campaign_id: impl Into<String>, vin: impl Into<String>) -> Self {
        CampaignError::UnknownDeploymentTarget {
            campaign_id: campaign_id.into(),
            vin: vin.into(),
        }
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(
        campaign_id: impl Into<String>,
        vin: impl Into<String>,
        from: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        CampaignError::InvalidTransition {
            campaign_id: campaign_id.into(),
            vin: vin.into(),
            from: from.into(),
            event: event.into(),
        }
    }
}
