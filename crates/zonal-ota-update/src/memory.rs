//! In-memory collaborators for tests, tooling and single-process deployments

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use zonal_ota_errors::{CampaignError, FleetError};

use crate::campaign::{
    CampaignMetadataMessage, CampaignNotification, CampaignRepository, DeploymentRepository,
    DeploymentState, DeploymentStatus, VehicleNotifier,
};
use crate::ecu::{Ecu, EcuId, EcuType};
use crate::firmware::{EcuRegistry, FirmwareArtifact, FirmwareRepository, ZoneLookup};
use crate::metadata::CampaignMetadata;
use crate::version::SemanticVersion;

/// Firmware repository holding artifacts and their bytes in memory.
///
/// Registering a newer version for a type replaces the latest pointer; older
/// blobs stay readable by storage reference.
#[derive(Debug, Default)]
pub struct InMemoryFirmwareRepository {
    latest: RwLock<HashMap<EcuType, FirmwareArtifact>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryFirmwareRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `bytes` as `version` for `ecu_type` and return the artifact.
    pub fn publish(
        &self,
        ecu_type: EcuType,
        version: SemanticVersion,
        bytes: Vec<u8>,
    ) -> FirmwareArtifact {
        let reference = format!("firmware/{}/{}.bin", ecu_type.as_str(), version);
        let artifact = FirmwareArtifact::describe(ecu_type, version, reference.clone(), &bytes);
        self.blobs.write().insert(reference, bytes);

        let mut latest = self.latest.write();
        let replace = latest
            .get(&ecu_type)
            .is_none_or(|current| current.target_version < version);
        if replace {
            latest.insert(ecu_type, artifact.clone());
        }
        artifact
    }

    /// Overwrite stored bytes without touching the artifact, for corruption tests.
    pub fn tamper(&self, storage_reference: &str, bytes: Vec<u8>) {
        self.blobs.write().insert(storage_reference.to_string(), bytes);
    }
}

#[async_trait]
impl FirmwareRepository for InMemoryFirmwareRepository {
    async fn latest_artifact(&self, ecu_type: EcuType) -> Result<FirmwareArtifact, FleetError> {
        self.latest
            .read()
            .get(&ecu_type)
            .cloned()
            .ok_or_else(|| FleetError::NoFirmwareForType(ecu_type.as_str().to_string()))
    }

    async fn read_firmware(&self, artifact: &FirmwareArtifact) -> Result<Vec<u8>, FleetError> {
        self.blobs
            .read()
            .get(&artifact.storage_reference)
            .cloned()
            .ok_or_else(|| {
                FleetError::repository(format!("missing blob {}", artifact.storage_reference))
            })
    }
}

/// ECU registry and vehicle inventory held in memory.
#[derive(Debug, Default)]
pub struct InMemoryEcuRegistry {
    ecus: RwLock<HashMap<EcuId, Ecu>>,
    vehicles: RwLock<BTreeMap<String, Vec<EcuId>>>,
}

impl InMemoryEcuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ecu`, replacing any previous record with the same id.
    pub fn insert(&self, ecu: Ecu) {
        self.ecus.write().insert(ecu.ecu_id.clone(), ecu);
    }

    /// Register `ecus` and attach them to vehicle `vin`.
    pub fn insert_vehicle(&self, vin: impl Into<String>, ecus: Vec<Ecu>) {
        let ids = ecus.iter().map(|e| e.ecu_id.clone()).collect();
        {
            let mut map = self.ecus.write();
            for ecu in ecus {
                map.insert(ecu.ecu_id.clone(), ecu);
            }
        }
        self.vehicles.write().insert(vin.into(), ids);
    }

    /// Snapshot of one ECU record.
    pub fn snapshot(&self, ecu_id: &EcuId) -> Option<Ecu> {
        self.ecus.read().get(ecu_id).cloned()
    }
}

#[async_trait]
impl EcuRegistry for InMemoryEcuRegistry {
    async fn get_ecu(&self, ecu_id: &EcuId) -> Result<Ecu, FleetError> {
        self.ecus
            .read()
            .get(ecu_id)
            .cloned()
            .ok_or_else(|| FleetError::UnknownEcu(ecu_id.to_string()))
    }

    async fn vehicle_ecus(&self, vin: &str) -> Result<Vec<EcuId>, FleetError> {
        self.vehicles
            .read()
            .get(vin)
            .cloned()
            .ok_or_else(|| FleetError::UnknownVehicle(vin.to_string()))
    }

    async fn record_version(
        &self,
        ecu_id: &EcuId,
        version: SemanticVersion,
    ) -> Result<(), FleetError> {
        let mut map = self.ecus.write();
        let ecu = map
            .get_mut(ecu_id)
            .ok_or_else(|| FleetError::UnknownEcu(ecu_id.to_string()))?;
        ecu.current_version = version;
        Ok(())
    }
}

/// Fixed ECU-to-zone table.
#[derive(Debug, Clone, Default)]
pub struct StaticZoneMap {
    zones: HashMap<EcuId, String>,
}

impl StaticZoneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(mut self, ecu_id: EcuId, zone_id: impl Into<String>) -> Self {
        self.zones.insert(ecu_id, zone_id.into());
        self
    }
}

impl FromIterator<(EcuId, String)> for StaticZoneMap {
    fn from_iter<T: IntoIterator<Item = (EcuId, String)>>(iter: T) -> Self {
        Self {
            zones: iter.into_iter().collect(),
        }
    }
}

impl ZoneLookup for StaticZoneMap {
    fn zone_of(&self, ecu: &Ecu) -> Option<String> {
        self.zones.get(&ecu.ecu_id).cloned()
    }
}

/// Campaigns and deployment records held in memory.
///
/// Each conditional update holds the map lock only for the compare and swap.
#[derive(Debug, Default)]
pub struct InMemoryCampaignStore {
    campaigns: RwLock<HashMap<String, CampaignMetadata>>,
    deployments: RwLock<HashMap<(String, String), DeploymentStatus>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignStore {
    async fn get(&self, campaign_id: &str) -> Result<Option<CampaignMetadata>, CampaignError> {
        Ok(self.campaigns.read().get(campaign_id).cloned())
    }

    async fn insert_if_absent(&self, campaign: CampaignMetadata) -> Result<bool, CampaignError> {
        let mut map = self.campaigns.write();
        if map.contains_key(&campaign.campaign_id) {
            return Ok(false);
        }
        map.insert(campaign.campaign_id.clone(), campaign);
        Ok(true)
    }
}

#[async_trait]
impl DeploymentRepository for InMemoryCampaignStore {
    async fn get(
        &self,
        campaign_id: &str,
        vin: &str,
    ) -> Result<Option<DeploymentStatus>, CampaignError> {
        Ok(self
            .deployments
            .read()
            .get(&(campaign_id.to_string(), vin.to_string()))
            .cloned())
    }

    async fn insert_if_absent(&self, status: DeploymentStatus) -> Result<bool, CampaignError> {
        let key = (status.campaign_id.clone(), status.vin.clone());
        let mut map = self.deployments.write();
        if map.contains_key(&key) {
            return Ok(false);
        }
        map.insert(key, status);
        Ok(true)
    }

    async fn update_if(
        &self,
        expected_state: DeploymentState,
        expected_revision: u64,
        next: DeploymentStatus,
    ) -> Result<bool, CampaignError> {
        let key = (next.campaign_id.clone(), next.vin.clone());
        let mut map = self.deployments.write();
        match map.get_mut(&key) {
            Some(current)
                if current.state == expected_state && current.revision == expected_revision =>
            {
                *current = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_campaign(
        &self,
        campaign_id: &str,
    ) -> Result<Vec<DeploymentStatus>, CampaignError> {
        let mut records: Vec<DeploymentStatus> = self
            .deployments
            .read()
            .values()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.vin.cmp(&b.vin));
        Ok(records)
    }
}

/// Message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Notification {
        vin: String,
        message: CampaignNotification,
    },
    Metadata {
        vin: String,
        message: CampaignMetadataMessage,
    },
}

/// Notifier that keeps every outbound message, optionally failing sends.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<SentMessage>>,
    offline: RwLock<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `vin` fail until [`set_online`](Self::set_online).
    pub fn set_offline(&self, vin: impl Into<String>) {
        self.offline.write().push(vin.into());
    }

    pub fn set_online(&self, vin: &str) {
        self.offline.write().retain(|v| v != vin);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().clone()
    }

    fn check_online(&self, vin: &str) -> Result<(), CampaignError> {
        if self.offline.read().iter().any(|v| v == vin) {
            return Err(CampaignError::Notification(format!("vehicle {vin} unreachable")));
        }
        Ok(())
    }
}

#[async_trait]
impl VehicleNotifier for RecordingNotifier {
    async fn send_campaign_notification(
        &self,
        vin: &str,
        notification: &CampaignNotification,
    ) -> Result<(), CampaignError> {
        self.check_online(vin)?;
        self.sent.write().push(SentMessage::Notification {
            vin: vin.to_string(),
            message: notification.clone(),
        });
        Ok(())
    }

    async fn send_campaign_metadata(
        &self,
        vin: &str,
        message: &CampaignMetadataMessage,
    ) -> Result<(), CampaignError> {
        self.check_online(vin)?;
        self.sent.write().push(SentMessage::Metadata {
            vin: vin.to_string(),
            message: message.clone(),
        });
        Ok(())
    }
}
