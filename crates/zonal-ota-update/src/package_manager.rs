//! Zonal package builds
//!
//! Targets are partitioned by zonal gateway and one container is built per
//! zone. Zones build independently: a failure in one is reported next to the
//! successful siblings and never aborts the campaign.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use zonal_ota_errors::{CodecError, PackageError};
use zonal_ota_package_format::{
    FirmwareMetadataRecord, PayloadCompressor, ZonalPackageWriter, parse_zonal_package,
};

use crate::config::PackagingConfig;
use crate::ecu::{Ecu, EcuId};
use crate::firmware::{FirmwareArtifact, FirmwareRepository, ZoneLookup, sha256, sha256_hex};
use crate::metadata::{
    CampaignMetadata, CampaignPackage, load_campaign_metadata, save_campaign_metadata,
    storage_error,
};
use crate::signing::{PackageSigner, sign_hex};
use crate::storage::PackageStore;

/// Zone collecting ECUs whose gateway could not be resolved.
pub const UNASSIGNED_ZONE: &str = "UNASSIGNED";

/// Single zone used when zonal optimisation is off.
pub const MONOLITHIC_ZONE: &str = "ALL";

/// Targets that share one zonal gateway, in ascending ECU id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonePartition {
    pub zone_id: String,
    pub members: Vec<Ecu>,
}

/// Split `targets` by zone.
///
/// Every distinct ECU id lands in exactly one partition; a repeated id keeps
/// its first occurrence. ECUs with no zone go to [`UNASSIGNED_ZONE`]. With
/// `zonal` false everything goes to [`MONOLITHIC_ZONE`]. Partitions are
/// returned in ascending zone id order.
pub fn partition_by_zone(targets: &[Ecu], lookup: &dyn ZoneLookup, zonal: bool) -> Vec<ZonePartition> {
    let mut seen = BTreeSet::new();
    let mut zones: BTreeMap<String, Vec<Ecu>> = BTreeMap::new();

    for ecu in targets {
        if !seen.insert(ecu.ecu_id.clone()) {
            continue;
        }
        let zone = if zonal {
            lookup
                .zone_of(ecu)
                .unwrap_or_else(|| UNASSIGNED_ZONE.to_string())
        } else {
            MONOLITHIC_ZONE.to_string()
        };
        zones.entry(zone).or_default().push(ecu.clone());
    }

    zones
        .into_iter()
        .map(|(zone_id, mut members)| {
            members.sort_by(|a, b| a.ecu_id.cmp(&b.ecu_id));
            ZonePartition { zone_id, members }
        })
        .collect()
}

/// A zone's members resolved to the firmware they will receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneGroup {
    pub zone_id: String,
    pub members: Vec<(Ecu, FirmwareArtifact)>,
    pub total_size: u64,
}

/// Metadata of one built package file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub zone_id: String,
    pub ecu_count: u16,
    pub ecu_ids: Vec<EcuId>,
    pub total_size: u64,
    pub file_reference: String,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Per-zone outcome of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneBuildOutcome {
    Built(PackageMetadata),
    Failed { zone_id: String, error: PackageError },
}

impl ZoneBuildOutcome {
    pub fn zone_id(&self) -> &str {
        match self {
            ZoneBuildOutcome::Built(m) => &m.zone_id,
            ZoneBuildOutcome::Failed { zone_id, .. } => zone_id,
        }
    }
}

/// Result of building every zone of a campaign, in zone id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub campaign_id: String,
    pub zones: Vec<ZoneBuildOutcome>,
}

impl BuildReport {
    pub fn built(&self) -> impl Iterator<Item = &PackageMetadata> {
        self.zones.iter().filter_map(|z| match z {
            ZoneBuildOutcome::Built(m) => Some(m),
            ZoneBuildOutcome::Failed { .. } => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &PackageError)> {
        self.zones.iter().filter_map(|z| match z {
            ZoneBuildOutcome::Failed { zone_id, error } => Some((zone_id.as_str(), error)),
            ZoneBuildOutcome::Built(_) => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Packages built for a campaign plus the metadata written beside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignBuild {
    pub report: BuildReport,
    pub metadata: CampaignMetadata,
}

/// Builds and stores zonal packages.
pub struct PackageManager {
    config: PackagingConfig,
    firmware: Arc<dyn FirmwareRepository>,
    store: PackageStore,
    compressor: Arc<dyn PayloadCompressor>,
    signer: Option<Arc<dyn PackageSigner>>,
}

impl PackageManager {
    pub fn new(
        config: PackagingConfig,
        firmware: Arc<dyn FirmwareRepository>,
        store: PackageStore,
    ) -> Self {
        let compressor = Arc::from(config.compression.compressor());
        Self {
            config,
            firmware,
            store,
            compressor,
            signer: None,
        }
    }

    /// Replace the compressor derived from the packaging config.
    pub fn with_compressor(mut self, compressor: Arc<dyn PayloadCompressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Sign each built package's content hash with `signer`.
    pub fn with_signer(mut self, signer: Arc<dyn PackageSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn store(&self) -> &PackageStore {
        &self.store
    }

    pub fn compressor(&self) -> &dyn PayloadCompressor {
        self.compressor.as_ref()
    }

    /// Build one package per zone for `targets`.
    pub async fn build_zonal_packages(
        &self,
        campaign_id: &str,
        targets: &[Ecu],
        lookup: &dyn ZoneLookup,
    ) -> BuildReport {
        let partitions = partition_by_zone(targets, lookup, self.config.zonal_optimization);
        for p in &partitions {
            info!(
                campaign_id,
                zone_id = %p.zone_id,
                ecu_count = p.members.len(),
                "Zone partition"
            );
        }

        let limit = self.config.zone_build_concurrency.max(1);
        let mut zones: Vec<ZoneBuildOutcome> = stream::iter(partitions)
            .map(|partition| async move {
                let zone_id = partition.zone_id.clone();
                match self.build_zone(campaign_id, partition).await {
                    Ok(meta) => {
                        info!(
                            campaign_id,
                            zone_id = %meta.zone_id,
                            size = meta.total_size,
                            sha256 = %meta.content_hash,
                            "Zone package built"
                        );
                        ZoneBuildOutcome::Built(meta)
                    }
                    Err(e) => {
                        error!(campaign_id, zone_id = %zone_id, error = %e, "Zone package build failed");
                        ZoneBuildOutcome::Failed {
                            error: PackageError::zone_failed(&zone_id, e.to_string()),
                            zone_id,
                        }
                    }
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        zones.sort_by(|a, b| a.zone_id().cmp(b.zone_id()));
        BuildReport {
            campaign_id: campaign_id.to_string(),
            zones,
        }
    }

    /// Build packages and write `{campaign_id}_metadata.json` for the zones that succeeded.
    pub async fn create_campaign_packages(
        &self,
        campaign_id: &str,
        targets: &[Ecu],
        lookup: &dyn ZoneLookup,
        rollback_enabled: bool,
    ) -> Result<CampaignBuild, PackageError> {
        let report = self.build_zonal_packages(campaign_id, targets, lookup).await;

        let packages: Vec<CampaignPackage> = report
            .built()
            .map(|m| CampaignPackage {
                zone_id: m.zone_id.clone(),
                ecu_count: m.ecu_count,
                package_size: m.total_size,
                content_hash: m.content_hash.clone(),
                storage_reference: m.file_reference.clone(),
                signature: m.signature.clone(),
            })
            .collect();
        let installation_sequence = packages.iter().map(|p| p.zone_id.clone()).collect();
        let target_ecus: BTreeSet<EcuId> = targets.iter().map(|e| e.ecu_id.clone()).collect();

        let metadata = CampaignMetadata {
            campaign_id: campaign_id.to_string(),
            created_at: Utc::now(),
            target_ecus: target_ecus.into_iter().collect(),
            packages,
            rollback_enabled,
            installation_sequence,
        };
        save_campaign_metadata(&self.store, &metadata).await?;

        if !report.is_complete() {
            warn!(
                campaign_id,
                failed = report.failed().count(),
                "Campaign created with failed zones"
            );
        }
        Ok(CampaignBuild { report, metadata })
    }

    pub async fn load_campaign_metadata(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignMetadata, PackageError> {
        load_campaign_metadata(&self.store, campaign_id).await
    }

    /// Resolve each member of `partition` to its latest firmware.
    pub async fn resolve_zone(&self, partition: ZonePartition) -> Result<ZoneGroup, PackageError> {
        let mut members = Vec::with_capacity(partition.members.len());
        let mut total_size = 0u64;
        for ecu in partition.members {
            let artifact = self.firmware.latest_artifact(ecu.ecu_type).await?;
            total_size = total_size.saturating_add(artifact.binary_size);
            members.push((ecu, artifact));
        }
        Ok(ZoneGroup {
            zone_id: partition.zone_id,
            members,
            total_size,
        })
    }

    async fn build_zone(
        &self,
        campaign_id: &str,
        partition: ZonePartition,
    ) -> Result<PackageMetadata, PackageError> {
        let path = self
            .store
            .package_path(campaign_id, &partition.zone_id)
            .map_err(storage_error)?;
        let group = self.resolve_zone(partition).await?;

        let ecu_count = u16::try_from(group.members.len()).ok().ok_or_else(|| {
            CodecError::overflow("ecu_count", group.members.len() as u64, u64::from(u16::MAX))
        })?;
        let mut writer = ZonalPackageWriter::new(&group.zone_id, ecu_count)?;

        for (ecu, artifact) in &group.members {
            let firmware = self.firmware.read_firmware(artifact).await?;
            let digest = sha256(&firmware);
            if artifact.digest() != Some(digest) {
                return Err(PackageError::DigestMismatch {
                    ecu_id: ecu.ecu_id.to_string(),
                });
            }

            // Off the async workers so sibling zones keep building
            let compressor = Arc::clone(&self.compressor);
            let payload = tokio::task::spawn_blocking(move || compressor.compress(&firmware))
                .await
                .map_err(|e| {
                    PackageError::zone_failed(&group.zone_id, format!("compression task: {e}"))
                })??;
            debug!(
                zone_id = %group.zone_id,
                ecu_id = %ecu.ecu_id,
                original = payload.original_size,
                compressed = payload.compressed_size,
                ratio = payload.ratio(),
                "Member payload prepared"
            );

            let record = FirmwareMetadataRecord::for_payload(
                ecu.ecu_id.as_str(),
                ecu.current_version.to_string(),
                artifact.target_version.to_string(),
                digest,
                &payload.bytes,
            )?;
            writer.push_member(&record, &payload.bytes)?;
        }

        let bytes = writer.finish()?;
        self.store
            .write_atomic(&path, &bytes)
            .await
            .map_err(storage_error)?;

        let content_hash = sha256_hex(&bytes);
        let signature = match &self.signer {
            Some(signer) => Some(sign_hex(signer.as_ref(), &content_hash)?),
            None => None,
        };

        Ok(PackageMetadata {
            zone_id: group.zone_id,
            ecu_count,
            ecu_ids: group.members.iter().map(|(e, _)| e.ecu_id.clone()).collect(),
            total_size: bytes.len() as u64,
            file_reference: path.to_string_lossy().into_owned(),
            content_hash,
            signature,
        })
    }
}

/// Per-member result of checking a built container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberVerification {
    pub ecu_id: String,
    pub target_version: String,
    pub payload_size: u32,
    pub digest_ok: bool,
}

/// Summary of checking a built container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageVerification {
    pub zone_id: String,
    pub content_hash: String,
    pub members: Vec<MemberVerification>,
}

impl PackageVerification {
    pub fn is_valid(&self) -> bool {
        self.members.iter().all(|m| m.digest_ok)
    }
}

/// Parse a container and recompute each member's SHA-256 after decompression.
pub fn verify_zonal_package(
    bytes: &[u8],
    compressor: &dyn PayloadCompressor,
) -> Result<PackageVerification, PackageError> {
    let package = parse_zonal_package(bytes)?;
    let mut members = Vec::with_capacity(package.members.len());
    for member in &package.members {
        let firmware = compressor.decompress(member.payload)?;
        members.push(MemberVerification {
            ecu_id: member.record.ecu_id.clone(),
            target_version: member.record.target_version.clone(),
            payload_size: member.record.payload_size,
            digest_ok: sha256(&firmware) == member.record.sha256,
        });
    }
    Ok(PackageVerification {
        zone_id: package.header.zone_id,
        content_hash: sha256_hex(bytes),
        members,
    })
}
