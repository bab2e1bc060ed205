//! Campaign deployment tracking
//!
//! A campaign is offered to each vehicle separately and every vehicle's
//! progress is an independent state machine record.

mod coordinator;
mod repository;
mod state;

pub use coordinator::{CampaignCoordinator, CampaignSummary, EventOutcome, VehiclePresence};
pub use repository::{
    CampaignMetadataMessage, CampaignNotification, CampaignRepository, DeploymentRepository,
    DownloadSession, RollbackData, VehicleNotifier, ZoneEndpoint,
};
pub use state::{
    CampaignResponse, DeploymentState, DeploymentStatus, EventError, ReportedStatus,
    TransitionRecord, VehicleEvent, next_state,
};
