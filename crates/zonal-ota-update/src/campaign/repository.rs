//! Collaborator interfaces for campaign state and vehicle messaging

use async_trait::async_trait;
use serde::Serialize;
use zonal_ota_errors::CampaignError;

use super::state::{DeploymentState, DeploymentStatus};
use crate::metadata::{CampaignMetadata, CampaignPackage};

/// Registered campaigns.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    async fn get(&self, campaign_id: &str) -> Result<Option<CampaignMetadata>, CampaignError>;

    /// Store `campaign` unless its id is taken. Returns whether it was stored.
    async fn insert_if_absent(&self, campaign: CampaignMetadata) -> Result<bool, CampaignError>;
}

/// Per-vehicle deployment records keyed by `(campaign_id, vin)`.
///
/// Writes are conditional on the record's current state and revision, so a
/// writer working from a stale read loses instead of overwriting.
#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    async fn get(
        &self,
        campaign_id: &str,
        vin: &str,
    ) -> Result<Option<DeploymentStatus>, CampaignError>;

    /// Store `status` unless a record for its key exists. Returns whether it was stored.
    async fn insert_if_absent(&self, status: DeploymentStatus) -> Result<bool, CampaignError>;

    /// Replace the record for `next`'s key if it is still in `expected_state`
    /// at `expected_revision`. Returns whether it was replaced.
    async fn update_if(
        &self,
        expected_state: DeploymentState,
        expected_revision: u64,
        next: DeploymentStatus,
    ) -> Result<bool, CampaignError>;

    /// Every record of `campaign_id`.
    async fn list_campaign(&self, campaign_id: &str)
    -> Result<Vec<DeploymentStatus>, CampaignError>;
}

/// Campaign offer sent to a vehicle, `msg_type = "ota_campaign"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignNotification {
    pub msg_type: &'static str,
    pub campaign_id: String,
    pub campaign_type: &'static str,
    pub vin: String,
    pub target_ecus: Vec<String>,
    pub total_size_bytes: u64,
    pub rollback_enabled: bool,
}

/// Download endpoint for one zone package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneEndpoint {
    pub zone_id: String,
    pub download_endpoint: String,
    pub package_size: u64,
    pub sha256: String,
}

/// Download session handed to an accepting vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadSession {
    pub session_id: String,
    pub method: &'static str,
    pub server_url: String,
    pub token_expiry_sec: u64,
    pub resume_supported: bool,
    pub partial_download_supported: bool,
    pub endpoints: Vec<ZoneEndpoint>,
}

/// Rollback terms sent with the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RollbackData {
    pub rollback_enabled: bool,
    pub rollback_timeout_sec: u64,
    pub auto_rollback_on_failure: bool,
}

/// Metadata sent after acceptance, `msg_type = "ota_campaign_metadata"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignMetadataMessage {
    pub msg_type: &'static str,
    pub campaign_id: String,
    pub download_session: DownloadSession,
    pub packages: Vec<CampaignPackage>,
    pub installation_sequence: Vec<String>,
    pub rollback_data: RollbackData,
}

/// Outbound messaging to vehicles.
#[async_trait]
pub trait VehicleNotifier: Send + Sync {
    async fn send_campaign_notification(
        &self,
        vin: &str,
        notification: &CampaignNotification,
    ) -> Result<(), CampaignError>;

    async fn send_campaign_metadata(
        &self,
        vin: &str,
        message: &CampaignMetadataMessage,
    ) -> Result<(), CampaignError>;
}
