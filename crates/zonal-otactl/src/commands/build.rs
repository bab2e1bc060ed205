//! `otactl build`: per-zone campaign packages from a firmware manifest

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use zonal_ota_errors::OtaError;
use zonal_ota_update::firmware::{EcuZoneField, FirmwareRepository};
use zonal_ota_update::package_manager::CampaignBuild;
use zonal_ota_update::{OtaConfig, PackageManager, PackageStore, ZoneBuildOutcome};

use crate::error::CliError;
use crate::{manifest, output};

pub struct BuildArgs<'a> {
    pub manifest: &'a Path,
    pub campaign_id: &'a str,
    pub vin: Option<&'a str>,
    pub out: Option<&'a Path>,
    pub monolithic: bool,
    pub no_rollback: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ZoneView {
    Built {
        zone_id: String,
        ecu_ids: Vec<String>,
        size: u64,
        sha256: String,
        file: String,
    },
    Failed {
        zone_id: String,
        error: String,
    },
}

/// Outcome of one build run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildView {
    pub campaign_id: String,
    pub storage_dir: PathBuf,
    pub metadata_file: PathBuf,
    pub rollback_enabled: bool,
    pub installation_sequence: Vec<String>,
    pub zones: Vec<ZoneView>,
}

impl BuildView {
    pub fn failed(&self) -> usize {
        self.zones
            .iter()
            .filter(|z| matches!(z, ZoneView::Failed { .. }))
            .count()
    }
}

pub async fn execute(args: BuildArgs<'_>, mut config: OtaConfig, json: bool) -> Result<()> {
    if let Some(out) = args.out {
        config.packaging.storage_dir = out.to_path_buf();
    }
    if args.monolithic {
        config.packaging.zonal_optimization = false;
    }

    let fleet = manifest::load(args.manifest).await?;
    let targets = fleet.targets(args.vin)?;
    if targets.is_empty() {
        return Err(CliError::Validation("manifest names no target ECUs".into()).into());
    }

    let store = PackageStore::open(&config.packaging.storage_dir).await?;
    let metadata_file = store.metadata_path(args.campaign_id)?;
    let firmware: Arc<dyn FirmwareRepository> = fleet.firmware.clone();
    let manager = PackageManager::new(config.packaging.clone(), firmware, store);

    let rollback_enabled = config.campaigns.rollback_enabled_default && !args.no_rollback;
    let build = manager
        .create_campaign_packages(args.campaign_id, &targets, &EcuZoneField, rollback_enabled)
        .await
        .map_err(|e| CliError::from(OtaError::from(e)))
        .with_context(|| format!("Failed to create campaign {}", args.campaign_id))?;

    let view = view_of(&build, &config.packaging.storage_dir, metadata_file);
    output::print_build(&view, json);

    let failed = view.failed();
    if failed > 0 {
        return Err(CliError::BuildIncomplete {
            campaign_id: view.campaign_id,
            failed,
        }
        .into());
    }
    info!(campaign_id = %view.campaign_id, zones = view.zones.len(), "Campaign packages built");
    Ok(())
}

fn view_of(build: &CampaignBuild, storage_dir: &Path, metadata_file: PathBuf) -> BuildView {
    let zones = build
        .report
        .zones
        .iter()
        .map(|outcome| match outcome {
            ZoneBuildOutcome::Built(meta) => ZoneView::Built {
                zone_id: meta.zone_id.clone(),
                ecu_ids: meta.ecu_ids.iter().map(ToString::to_string).collect(),
                size: meta.total_size,
                sha256: meta.content_hash.clone(),
                file: meta.file_reference.clone(),
            },
            ZoneBuildOutcome::Failed { zone_id, error } => ZoneView::Failed {
                zone_id: zone_id.clone(),
                error: error.to_string(),
            },
        })
        .collect();

    BuildView {
        campaign_id: build.metadata.campaign_id.clone(),
        storage_dir: storage_dir.to_path_buf(),
        metadata_file,
        rollback_enabled: build.metadata.rollback_enabled,
        installation_sequence: build.metadata.installation_sequence.clone(),
        zones,
    }
}
