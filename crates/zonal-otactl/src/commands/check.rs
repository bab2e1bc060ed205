//! `otactl check`: version report for one vehicle

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use zonal_ota_errors::{FleetError, OtaError};
use zonal_ota_update::firmware::{EcuRegistry, FirmwareRepository};
use zonal_ota_update::version_manager::{EcuCheckEntry, UpdateStatistics};
use zonal_ota_update::{OtaConfig, VersionManager};

use crate::error::CliError;
use crate::{manifest, output};

#[derive(Debug, Clone, Serialize)]
pub struct CheckView {
    pub vin: String,
    pub statistics: UpdateStatistics,
    pub entries: Vec<EcuCheckEntry>,
}

pub async fn execute(
    manifest_path: &Path,
    vin: &str,
    outdated_only: bool,
    config: &OtaConfig,
    json: bool,
) -> Result<()> {
    let fleet = manifest::load(manifest_path).await?;
    let firmware: Arc<dyn FirmwareRepository> = fleet.firmware.clone();
    let registry: Arc<dyn EcuRegistry> = fleet.registry.clone();
    let manager = VersionManager::new(config.version_policy.clone(), firmware, registry);

    let report = manager.check_fleet(vin).await.map_err(|e| match e {
        FleetError::UnknownVehicle(v) => anyhow::Error::from(CliError::NotFound(format!("vehicle {v}"))),
        other => CliError::from(OtaError::from(other)).into(),
    })?;
    let statistics = manager
        .update_statistics(vin)
        .await
        .map_err(|e| CliError::from(OtaError::from(e)))?;

    let entries = report
        .entries
        .into_iter()
        .filter(|e| !outdated_only || e.result().is_some_and(|r| r.needs_update))
        .collect();

    output::print_check(
        &CheckView {
            vin: vin.to_string(),
            statistics,
            entries,
        },
        json,
    );
    Ok(())
}
