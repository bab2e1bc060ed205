//! Campaign package metadata exchanged with vehicles and the transport layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zonal_ota_errors::PackageError;

use crate::ecu::EcuId;
use crate::storage::PackageStore;

/// One built zone package as recorded in a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignPackage {
    pub zone_id: String,
    pub ecu_count: u16,
    pub package_size: u64,
    /// Lowercase hex SHA-256 of the whole package file.
    pub content_hash: String,
    pub storage_reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Everything a vehicle needs to fetch and install a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignMetadata {
    pub campaign_id: String,
    pub created_at: DateTime<Utc>,
    pub target_ecus: Vec<EcuId>,
    pub packages: Vec<CampaignPackage>,
    pub rollback_enabled: bool,
    /// Zone ids in the order packages should be installed.
    pub installation_sequence: Vec<String>,
}

impl CampaignMetadata {
    pub fn package(&self, zone_id: &str) -> Option<&CampaignPackage> {
        self.packages.iter().find(|p| p.zone_id == zone_id)
    }

    pub fn total_size(&self) -> u64 {
        self.packages.iter().map(|p| p.package_size).sum()
    }
}

/// Persist `metadata` as `{campaign_id}_metadata.json` in `store`.
pub async fn save_campaign_metadata(
    store: &PackageStore,
    metadata: &CampaignMetadata,
) -> Result<(), PackageError> {
    let path = store
        .metadata_path(&metadata.campaign_id)
        .map_err(storage_error)?;
    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|e| PackageError::storage(format!("Failed to serialize metadata: {e}")))?;
    store.write_atomic(&path, &json).await.map_err(storage_error)
}

/// Load the metadata written by [`save_campaign_metadata`].
pub async fn load_campaign_metadata(
    store: &PackageStore,
    campaign_id: &str,
) -> Result<CampaignMetadata, PackageError> {
    let path = store.metadata_path(campaign_id).map_err(storage_error)?;
    let raw = store.read(&path).await.map_err(storage_error)?;
    serde_json::from_slice(&raw)
        .map_err(|e| PackageError::storage(format!("Corrupt metadata for {campaign_id}: {e}")))
}

pub(crate) fn storage_error(e: anyhow::Error) -> PackageError {
    PackageError::storage(format!("{e:#}"))
}
