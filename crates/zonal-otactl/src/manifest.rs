//! Fleet manifest: firmware images on disk plus the vehicles they target
//!
//! ```json
//! {
//!   "firmware": [{ "ecu_type": "ECM", "version": "2.1.0", "path": "ecm-2.1.0.bin" }],
//!   "vehicles": [{ "vin": "VIN0001", "ecus": [{ "ecu_id": "ECU_001", "ecu_type": "ECM",
//!                 "zone_id": "ZONE_FRONT", "current_version": "2.0.0" }] }]
//! }
//! ```
//!
//! Relative firmware paths resolve against the manifest's directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use zonal_ota_update::memory::{InMemoryEcuRegistry, InMemoryFirmwareRepository};
use zonal_ota_update::{Ecu, EcuType, SemanticVersion};

use crate::error::CliError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub firmware: Vec<FirmwareEntry>,
    #[serde(default)]
    pub vehicles: Vec<VehicleEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirmwareEntry {
    pub ecu_type: EcuType,
    pub version: SemanticVersion,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleEntry {
    pub vin: String,
    pub ecus: Vec<Ecu>,
}

/// A manifest loaded into in-memory collaborators.
pub struct LoadedFleet {
    pub manifest: Manifest,
    pub firmware: Arc<InMemoryFirmwareRepository>,
    pub registry: Arc<InMemoryEcuRegistry>,
}

impl LoadedFleet {
    /// ECUs of `vin`, or of every vehicle when `vin` is `None`.
    pub fn targets(&self, vin: Option<&str>) -> Result<Vec<Ecu>, CliError> {
        match vin {
            Some(vin) => self
                .manifest
                .vehicles
                .iter()
                .find(|v| v.vin == vin)
                .map(|v| v.ecus.clone())
                .ok_or_else(|| CliError::NotFound(format!("vehicle {vin}"))),
            None => Ok(self
                .manifest
                .vehicles
                .iter()
                .flat_map(|v| v.ecus.iter().cloned())
                .collect()),
        }
    }
}

/// Read `path`, then load every firmware image it lists.
pub async fn load(path: &Path) -> Result<LoadedFleet, CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::from_read(path, e))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .map_err(|e| CliError::Manifest(format!("{}: {e}", path.display())))?;
    validate(&manifest)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let firmware = Arc::new(InMemoryFirmwareRepository::new());
    for entry in &manifest.firmware {
        let image = base.join(&entry.path);
        let bytes = tokio::fs::read(&image)
            .await
            .map_err(|e| CliError::from_read(&image, e))?;
        let artifact = firmware.publish(entry.ecu_type, entry.version, bytes);
        debug!(
            ecu_type = %entry.ecu_type,
            version = %entry.version,
            size = artifact.binary_size,
            "Published firmware image"
        );
    }

    let registry = Arc::new(InMemoryEcuRegistry::new());
    for vehicle in &manifest.vehicles {
        registry.insert_vehicle(vehicle.vin.clone(), vehicle.ecus.clone());
    }

    Ok(LoadedFleet {
        manifest,
        firmware,
        registry,
    })
}

fn validate(manifest: &Manifest) -> Result<(), CliError> {
    let mut vins = std::collections::BTreeSet::new();
    for vehicle in &manifest.vehicles {
        if vehicle.vin.trim().is_empty() {
            return Err(CliError::Manifest("vehicle with empty vin".into()));
        }
        if !vins.insert(vehicle.vin.as_str()) {
            return Err(CliError::Manifest(format!("duplicate vehicle {}", vehicle.vin)));
        }
    }
    Ok(())
}
