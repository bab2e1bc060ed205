//! `otactl verify <file>`: integrity checks down to each firmware digest

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use zonal_ota_package_format::{PayloadCompressor, inspect_single_package};
use zonal_ota_update::OtaConfig;
use zonal_ota_update::firmware::sha256_hex;
use zonal_ota_update::package_manager::{PackageVerification, verify_zonal_package};

use super::{CompressionArg, PackageKind, read_package};
use crate::error::CliError;
use crate::output;

/// Single-firmware package whose CRC and sizes checked out.
#[derive(Debug, Clone, Serialize)]
pub struct SingleVerification {
    pub target_ecu_id: u32,
    pub version: String,
    pub firmware_size: u64,
    pub firmware_sha256: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum VerificationView {
    Swpg(SingleVerification),
    Otap(PackageVerification),
}

impl VerificationView {
    pub fn is_valid(&self) -> bool {
        match self {
            VerificationView::Swpg(_) => true,
            VerificationView::Otap(v) => v.is_valid(),
        }
    }
}

pub async fn execute(
    file: &Path,
    compression: Option<CompressionArg>,
    config: &OtaConfig,
    json: bool,
) -> Result<()> {
    let bytes = read_package(file).await?;
    let level = config.packaging.compression.level;
    let compressor = match compression {
        Some(arg) => arg.compressor(level),
        None => config.packaging.compression.compressor(),
    };

    let view = verify(&bytes, compressor.as_ref())?;
    output::print_verification(&view, json);

    if !view.is_valid() {
        return Err(CliError::InvalidPackage(format!(
            "{}: digest mismatch",
            file.display()
        ))
        .into());
    }
    info!(file = %file.display(), "Package verified");
    Ok(())
}

/// Check `bytes` with `compressor` undoing payload compression.
pub fn verify(bytes: &[u8], compressor: &dyn PayloadCompressor) -> Result<VerificationView, CliError> {
    match PackageKind::detect(bytes) {
        PackageKind::Zonal => verify_zonal_package(bytes, compressor)
            .map(VerificationView::Otap)
            .map_err(|e| CliError::InvalidPackage(e.to_string())),
        PackageKind::Single => {
            let package = inspect_single_package(bytes)
                .map_err(|e| CliError::InvalidPackage(e.to_string()))?;
            let firmware = package
                .firmware(compressor)
                .map_err(|e| CliError::InvalidPackage(e.to_string()))?;
            Ok(VerificationView::Swpg(SingleVerification {
                target_ecu_id: package.header.target_ecu_id,
                version: package.header.version_string(),
                firmware_size: firmware.len() as u64,
                firmware_sha256: sha256_hex(&firmware),
            }))
        }
    }
}
