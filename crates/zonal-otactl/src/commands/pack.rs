//! `otactl pack`: wrap one firmware image in a 64-byte SWPG header

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::info;
use zonal_ota_package_format::{SoftwarePackageHeader, SoftwareType, build_single_package};
use zonal_ota_update::OtaConfig;
use zonal_ota_update::firmware::sha256_hex;

use super::CompressionArg;
use crate::error::CliError;
use crate::output;

pub struct PackArgs<'a> {
    pub firmware: &'a Path,
    pub out: &'a Path,
    pub target_ecu: u16,
    pub software_type: SoftwareType,
    pub version: &'a str,
    pub compression: Option<CompressionArg>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PackView {
    pub file: String,
    pub target_ecu_id: u16,
    pub software_type: &'static str,
    pub version: String,
    pub firmware_size: u64,
    pub package_size: u64,
    pub sha256: String,
}

pub async fn execute(args: PackArgs<'_>, config: &OtaConfig, json: bool) -> Result<()> {
    let firmware = tokio::fs::read(args.firmware)
        .await
        .map_err(|e| CliError::from_read(args.firmware, e))?;

    let [major, minor, patch, build] = parse_version(args.version)?;
    let template = SoftwarePackageHeader::new(args.target_ecu, args.software_type)
        .with_version(major, minor, patch, build);
    let compressor = match args.compression {
        Some(arg) => arg.compressor(config.packaging.compression.level),
        None => config.packaging.compression.compressor(),
    };
    let package = build_single_package(&template, &firmware, compressor.as_ref())
        .map_err(|e| CliError::Validation(e.to_string()))?;

    tokio::fs::write(args.out, &package).await.map_err(CliError::Io)?;
    info!(file = %args.out.display(), size = package.len(), "Wrote single-firmware package");

    output::print_pack(
        &PackView {
            file: args.out.display().to_string(),
            target_ecu_id: args.target_ecu,
            software_type: args.software_type.as_str(),
            version: template.version_string(),
            firmware_size: firmware.len() as u64,
            package_size: package.len() as u64,
            sha256: sha256_hex(&package),
        },
        json,
    );
    Ok(())
}

/// `MAJOR.MINOR.PATCH` or `MAJOR.MINOR.PATCH.BUILD`; a missing build is 0.
pub fn parse_version(text: &str) -> Result<[u32; 4], CliError> {
    let invalid = || CliError::Validation(format!("invalid package version '{text}'"));
    let parts = text
        .split('.')
        .map(|p| {
            if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            p.parse::<u32>().ok().ok_or_else(invalid)
        })
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [a, b, c] => Ok([*a, *b, *c, 0]),
        [a, b, c, d] => Ok([*a, *b, *c, *d]),
        _ => Err(invalid()),
    }
}
