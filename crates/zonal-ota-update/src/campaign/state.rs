//! Deployment states, inbound vehicle events and the transition table

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-vehicle deployment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Created,
    Notified,
    Accepted,
    Rejected,
    Downloading,
    DownloadComplete,
    Installing,
    InstallComplete,
    Verifying,
    Completed,
    Failed,
    RolledBack,
}

impl DeploymentState {
    pub const ALL: [DeploymentState; 12] = [
        DeploymentState::Created,
        DeploymentState::Notified,
        DeploymentState::Accepted,
        DeploymentState::Rejected,
        DeploymentState::Downloading,
        DeploymentState::DownloadComplete,
        DeploymentState::Installing,
        DeploymentState::InstallComplete,
        DeploymentState::Verifying,
        DeploymentState::Completed,
        DeploymentState::Failed,
        DeploymentState::RolledBack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentState::Created => "created",
            DeploymentState::Notified => "notified",
            DeploymentState::Accepted => "accepted",
            DeploymentState::Rejected => "rejected",
            DeploymentState::Downloading => "downloading",
            DeploymentState::DownloadComplete => "download_complete",
            DeploymentState::Installing => "installing",
            DeploymentState::InstallComplete => "install_complete",
            DeploymentState::Verifying => "verifying",
            DeploymentState::Completed => "completed",
            DeploymentState::Failed => "failed",
            DeploymentState::RolledBack => "rolled_back",
        }
    }

    /// No event moves a record out of a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DeploymentState::Completed | DeploymentState::Rejected | DeploymentState::RolledBack
        )
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle answer to a campaign notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignResponse {
    Accepted,
    Rejected,
}

/// Status string reported by a vehicle at the end of a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportedStatus(pub String);

impl ReportedStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Vehicles report success with any of a few spellings.
    pub fn is_success(&self) -> bool {
        matches!(
            self.0.to_ascii_lowercase().as_str(),
            "success" | "succeeded" | "completed" | "complete" | "ok" | "passed" | "verified"
        )
    }
}

/// Error detail carried by `ota_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Inbound lifecycle message from a vehicle, tagged by `msg_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum VehicleEvent {
    VehicleWakeUp {
        #[serde(default)]
        event: Option<String>,
        #[serde(default)]
        vehicle_state: serde_json::Value,
    },
    VciReport {
        #[serde(default)]
        inventory: serde_json::Value,
    },
    OtaReadinessResponse {
        #[serde(default = "unknown_status")]
        overall_status: String,
    },
    OtaCampaignResponse {
        campaign_id: String,
        status: CampaignResponse,
    },
    OtaDownloadProgress {
        campaign_id: String,
        percentage: f64,
    },
    OtaDownloadComplete {
        campaign_id: String,
        status: ReportedStatus,
    },
    OtaDownloadFailed {
        campaign_id: String,
        #[serde(default)]
        reason: String,
    },
    OtaInstallationStart {
        campaign_id: String,
    },
    OtaInstallationProgress {
        campaign_id: String,
        percentage: f64,
    },
    OtaInstallationComplete {
        campaign_id: String,
        overall_status: ReportedStatus,
    },
    OtaVerificationStart {
        campaign_id: String,
    },
    OtaVerificationComplete {
        campaign_id: String,
        verification_status: ReportedStatus,
    },
    OtaRollbackComplete {
        campaign_id: String,
    },
    OtaError {
        campaign_id: String,
        #[serde(default)]
        error: EventError,
    },
}

fn unknown_status() -> String {
    "unknown".to_string()
}

impl VehicleEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            VehicleEvent::VehicleWakeUp { .. } => "vehicle_wake_up",
            VehicleEvent::VciReport { .. } => "vci_report",
            VehicleEvent::OtaReadinessResponse { .. } => "ota_readiness_response",
            VehicleEvent::OtaCampaignResponse { .. } => "ota_campaign_response",
            VehicleEvent::OtaDownloadProgress { .. } => "ota_download_progress",
            VehicleEvent::OtaDownloadComplete { .. } => "ota_download_complete",
            VehicleEvent::OtaDownloadFailed { .. } => "ota_download_failed",
            VehicleEvent::OtaInstallationStart { .. } => "ota_installation_start",
            VehicleEvent::OtaInstallationProgress { .. } => "ota_installation_progress",
            VehicleEvent::OtaInstallationComplete { .. } => "ota_installation_complete",
            VehicleEvent::OtaVerificationStart { .. } => "ota_verification_start",
            VehicleEvent::OtaVerificationComplete { .. } => "ota_verification_complete",
            VehicleEvent::OtaRollbackComplete { .. } => "ota_rollback_complete",
            VehicleEvent::OtaError { .. } => "ota_error",
        }
    }

    /// Campaign the event belongs to; `None` for presence events.
    pub fn campaign_id(&self) -> Option<&str> {
        match self {
            VehicleEvent::VehicleWakeUp { .. }
            | VehicleEvent::VciReport { .. }
            | VehicleEvent::OtaReadinessResponse { .. } => None,
            VehicleEvent::OtaCampaignResponse { campaign_id, .. }
            | VehicleEvent::OtaDownloadProgress { campaign_id, .. }
            | VehicleEvent::OtaDownloadComplete { campaign_id, .. }
            | VehicleEvent::OtaDownloadFailed { campaign_id, .. }
            | VehicleEvent::OtaInstallationStart { campaign_id }
            | VehicleEvent::OtaInstallationProgress { campaign_id, .. }
            | VehicleEvent::OtaInstallationComplete { campaign_id, .. }
            | VehicleEvent::OtaVerificationStart { campaign_id }
            | VehicleEvent::OtaVerificationComplete { campaign_id, .. }
            | VehicleEvent::OtaRollbackComplete { campaign_id }
            | VehicleEvent::OtaError { campaign_id, .. } => Some(campaign_id),
        }
    }

    /// Phase progress carried by the event, clamped to 0..=100.
    pub fn progress(&self) -> Option<u8> {
        match self {
            VehicleEvent::OtaDownloadProgress { percentage, .. }
            | VehicleEvent::OtaInstallationProgress { percentage, .. } => {
                Some(percentage.clamp(0.0, 100.0) as u8)
            }
            _ => None,
        }
    }

    /// Failure description recorded when the event fails a deployment.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            VehicleEvent::OtaError { error, .. } => Some(match &error.code {
                Some(code) => format!("{code}: {}", error.message),
                None => error.message.clone(),
            }),
            VehicleEvent::OtaDownloadFailed { reason, .. } => Some(reason.clone()),
            VehicleEvent::OtaDownloadComplete { status, .. } if !status.is_success() => {
                Some(format!("download reported {}", status.0))
            }
            VehicleEvent::OtaInstallationComplete { overall_status, .. }
                if !overall_status.is_success() =>
            {
                Some(format!("installation reported {}", overall_status.0))
            }
            VehicleEvent::OtaVerificationComplete {
                verification_status,
                ..
            } if !verification_status.is_success() => {
                Some(format!("verification reported {}", verification_status.0))
            }
            _ => None,
        }
    }
}

/// Next state for `event` in state `from`, or `None` if the pair is not allowed.
///
/// This is the complete allow-list. `Created` records accept no events since
/// the vehicle has not been notified yet.
pub fn next_state(
    from: DeploymentState,
    event: &VehicleEvent,
    rollback_enabled: bool,
) -> Option<DeploymentState> {
    use DeploymentState as S;
    use VehicleEvent as E;

    match (from, event) {
        (S::Created, _) => None,
        (S::Failed, E::OtaError { .. }) => None,
        (s, E::OtaError { .. }) if !s.is_terminal() => Some(S::Failed),

        (S::Notified, E::OtaCampaignResponse { status, .. }) => Some(match status {
            CampaignResponse::Accepted => S::Accepted,
            CampaignResponse::Rejected => S::Rejected,
        }),

        (S::Accepted | S::Downloading, E::OtaDownloadProgress { .. }) => Some(S::Downloading),
        (S::Accepted | S::Downloading, E::OtaDownloadComplete { status, .. }) => {
            Some(if status.is_success() {
                S::DownloadComplete
            } else {
                S::Failed
            })
        }
        (S::Accepted | S::Downloading, E::OtaDownloadFailed { .. }) => Some(S::Failed),

        (S::DownloadComplete, E::OtaInstallationStart { .. }) => Some(S::Installing),
        (S::Installing, E::OtaInstallationProgress { .. }) => Some(S::Installing),
        (S::DownloadComplete | S::Installing, E::OtaInstallationComplete { overall_status, .. }) => {
            Some(if overall_status.is_success() {
                S::InstallComplete
            } else {
                S::Failed
            })
        }

        (S::InstallComplete, E::OtaVerificationStart { .. }) => Some(S::Verifying),
        (
            S::InstallComplete | S::Verifying,
            E::OtaVerificationComplete {
                verification_status,
                ..
            },
        ) => Some(if verification_status.is_success() {
            S::Completed
        } else {
            S::Failed
        }),

        (S::Failed, E::OtaRollbackComplete { .. }) if rollback_enabled => Some(S::RolledBack),

        _ => None,
    }
}

/// One applied transition, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: DeploymentState,
    pub to: DeploymentState,
    pub event: String,
    pub at: DateTime<Utc>,
}

/// Deployment record for one (campaign, vehicle) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub campaign_id: String,
    pub vin: String,
    pub state: DeploymentState,
    /// Progress of the current phase, 0..=100
    pub progress: u8,
    /// Bumped on every applied transition
    pub revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub history: Vec<TransitionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentStatus {
    pub fn new(campaign_id: impl Into<String>, vin: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            campaign_id: campaign_id.into(),
            vin: vin.into(),
            state: DeploymentState::Created,
            progress: 0,
            revision: 0,
            error: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of `self` moved to `to` by `event`.
    pub fn advanced(&self, to: DeploymentState, event: &str, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.history.push(TransitionRecord {
            from: self.state,
            to,
            event: event.to_string(),
            at,
        });
        next.state = to;
        next.revision += 1;
        next.updated_at = at;
        next.progress = match to {
            DeploymentState::DownloadComplete
            | DeploymentState::InstallComplete
            | DeploymentState::Completed => 100,
            s if s == self.state => self.progress,
            _ => 0,
        };
        next
    }
}
