//! Firmware artifacts and the collaborator interfaces the core depends on
//!
//! The ECU registry, firmware repository and zone topology live outside this
//! crate. They are reached only through the traits below so a persistent or
//! remote backing store can be swapped in without touching the algorithms.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zonal_ota_errors::FleetError;

use crate::ecu::{Ecu, EcuId, EcuType};
use crate::version::SemanticVersion;

/// A published firmware image, immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareArtifact {
    pub ecu_type: EcuType,
    pub target_version: SemanticVersion,
    pub binary_size: u64,
    /// Lowercase hex SHA-256 of the image bytes.
    pub content_hash: String,
    pub storage_reference: String,
}

impl FirmwareArtifact {
    /// Describe `bytes` stored at `storage_reference`.
    pub fn describe(
        ecu_type: EcuType,
        target_version: SemanticVersion,
        storage_reference: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            ecu_type,
            target_version,
            binary_size: bytes.len() as u64,
            content_hash: sha256_hex(bytes),
            storage_reference: storage_reference.into(),
        }
    }

    /// Raw digest decoded from `content_hash`, if it is well-formed.
    pub fn digest(&self) -> Option<[u8; 32]> {
        let raw = hex::decode(&self.content_hash).ok()?;
        raw.try_into().ok()
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Raw SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Source of published firmware.
#[async_trait]
pub trait FirmwareRepository: Send + Sync {
    /// Newest artifact published for `ecu_type`.
    async fn latest_artifact(&self, ecu_type: EcuType) -> Result<FirmwareArtifact, FleetError>;

    /// Image bytes for `artifact`.
    async fn read_firmware(&self, artifact: &FirmwareArtifact) -> Result<Vec<u8>, FleetError>;
}

/// Inventory of ECUs and the vehicles they belong to.
#[async_trait]
pub trait EcuRegistry: Send + Sync {
    async fn get_ecu(&self, ecu_id: &EcuId) -> Result<Ecu, FleetError>;

    /// ECU ids installed in vehicle `vin`.
    async fn vehicle_ecus(&self, vin: &str) -> Result<Vec<EcuId>, FleetError>;

    /// Persist a newly installed version.
    async fn record_version(
        &self,
        ecu_id: &EcuId,
        version: SemanticVersion,
    ) -> Result<(), FleetError>;
}

/// ECU to zonal gateway resolution.
pub trait ZoneLookup: Send + Sync {
    /// Zone serving `ecu`, or `None` if it cannot be resolved.
    fn zone_of(&self, ecu: &Ecu) -> Option<String>;
}

/// Resolves zones from each ECU's own `zone_id` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcuZoneField;

impl ZoneLookup for EcuZoneField {
    fn zone_of(&self, ecu: &Ecu) -> Option<String> {
        ecu.zone_id.clone().filter(|z| !z.is_empty())
    }
}
