//! `otactl inspect <file>`: decode a package without touching its payloads

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use zonal_ota_package_format::{CompressionFlag, inspect_single_package, parse_zonal_package};
use zonal_ota_update::firmware::sha256_hex;

use super::{PackageKind, read_package};
use crate::error::CliError;
use crate::output;

/// Decoded single-firmware package header.
#[derive(Debug, Clone, Serialize)]
pub struct SingleView {
    pub size: u64,
    pub sha256: String,
    pub target_ecu_id: u32,
    pub software_type: &'static str,
    pub compressed: bool,
    pub payload_size: u64,
    pub uncompressed_size: u64,
    pub version: String,
    pub version_timestamp: u32,
    pub version_serial: u32,
    pub crc32: String,
    pub source_ecu_id: u32,
    pub hop_count: u32,
    pub sequence_number: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZonalMemberView {
    pub ecu_id: String,
    pub current_version: String,
    pub target_version: String,
    pub payload_size: u32,
    pub sha256: String,
}

/// Decoded zonal container.
#[derive(Debug, Clone, Serialize)]
pub struct ZonalView {
    pub size: u64,
    pub sha256: String,
    pub format_version: u16,
    pub zone_id: String,
    pub ecu_count: u16,
    pub members: Vec<ZonalMemberView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum PackageView {
    Swpg(SingleView),
    Otap(ZonalView),
}

pub async fn execute(file: &Path, json: bool) -> Result<()> {
    let bytes = read_package(file).await?;
    let view = describe(&bytes)?;
    output::print_package_view(&view, json);
    Ok(())
}

/// Decode `bytes` as whichever container its magic announces.
pub fn describe(bytes: &[u8]) -> Result<PackageView, CliError> {
    let size = bytes.len() as u64;
    let sha256 = sha256_hex(bytes);
    match PackageKind::detect(bytes) {
        PackageKind::Zonal => {
            let package =
                parse_zonal_package(bytes).map_err(|e| CliError::InvalidPackage(e.to_string()))?;
            let members = package
                .members
                .iter()
                .map(|m| ZonalMemberView {
                    ecu_id: m.record.ecu_id.clone(),
                    current_version: m.record.current_version.clone(),
                    target_version: m.record.target_version.clone(),
                    payload_size: m.record.payload_size,
                    sha256: hex::encode(m.record.sha256),
                })
                .collect();
            Ok(PackageView::Otap(ZonalView {
                size,
                sha256,
                format_version: package.header.format_version,
                zone_id: package.header.zone_id,
                ecu_count: package.header.ecu_count,
                members,
            }))
        }
        PackageKind::Single => {
            let package = inspect_single_package(bytes)
                .map_err(|e| CliError::InvalidPackage(e.to_string()))?;
            let h = package.header;
            Ok(PackageView::Swpg(SingleView {
                size,
                sha256,
                target_ecu_id: h.target_ecu_id,
                software_type: h.software_type.as_str(),
                compressed: h.compression == CompressionFlag::Compressed,
                payload_size: h.payload_size,
                uncompressed_size: h.uncompressed_size,
                version: h.version_string(),
                version_timestamp: h.version_timestamp,
                version_serial: h.version_serial,
                crc32: format!("{:#010x}", h.payload_crc32),
                source_ecu_id: h.source_ecu_id,
                hop_count: h.hop_count,
                sequence_number: h.sequence_number,
            }))
        }
    }
}
