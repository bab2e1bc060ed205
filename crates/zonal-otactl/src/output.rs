//! Output formatting for CLI responses

use std::path::Path;

use anyhow::Error;
use colored::*;
use serde::Serialize;
use serde_json::json;
use zonal_ota_update::OtaConfig;
use zonal_ota_update::version_manager::{EcuCheckEntry, UpdatePriority};

use crate::commands::build::{BuildView, ZoneView};
use crate::commands::check::CheckView;
use crate::commands::inspect::PackageView;
use crate::commands::pack::PackView;
use crate::commands::verify::VerificationView;
use crate::error::CliError;

/// Print `{"success": true, <key>: value}`.
fn print_success_json<T: Serialize>(key: &str, value: &T) {
    let output = json!({ "success": true, key: value });
    match serde_json::to_string_pretty(&output) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format {} as JSON: {}", key, e),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let mut detail = json!({
        "message": format!("{error:#}"),
        "type": error_type_name(error)
    });
    if let Some(CliError::Core(core)) = error.downcast_ref::<CliError>() {
        detail["category"] = json!(core.category().to_string());
        detail["severity"] = json!(core.severity().to_string());
        detail["recoverable"] = json!(core.is_recoverable());
    }
    let error_json = json!({ "success": false, "error": detail });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format error as JSON: {}", e),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "Caused by:".yellow(), cause);
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::NotFound(_)) => "not_found",
        Some(CliError::InvalidPackage(_)) => "invalid_package",
        Some(CliError::Validation(_)) => "validation",
        Some(CliError::Manifest(_)) => "manifest",
        Some(CliError::BuildIncomplete { .. }) => "build_incomplete",
        Some(CliError::Io(_)) => "io",
        Some(CliError::Json(_)) => "json",
        Some(CliError::Core(_)) => "core",
        None => "error",
    }
}

pub fn print_package_view(view: &PackageView, json: bool) {
    if json {
        print_success_json("package", view);
        return;
    }

    match view {
        PackageView::Swpg(h) => {
            println!("{} {}", "Single-firmware package".bold(), "(SWPG)".dimmed());
            println!("  Size: {} bytes", h.size);
            println!("  SHA-256: {}", h.sha256.dimmed());
            println!("  Target ECU: {}", h.target_ecu_id);
            println!("  Software type: {}", h.software_type);
            println!("  Version: {}", h.version.cyan());
            println!(
                "  Payload: {} bytes ({})",
                h.payload_size,
                if h.compressed {
                    format!("compressed from {} bytes", h.uncompressed_size)
                } else {
                    "uncompressed".to_string()
                }
            );
            println!("  CRC-32: {}", h.crc32);
            if h.source_ecu_id != 0 || h.hop_count != 0 {
                println!(
                    "  Routing: source ECU {}, {} hop(s), sequence {}",
                    h.source_ecu_id, h.hop_count, h.sequence_number
                );
            }
        }
        PackageView::Otap(z) => {
            println!(
                "{} {} {}",
                "Zonal package".bold(),
                z.zone_id.cyan(),
                format!("(OTAP v{})", z.format_version).dimmed()
            );
            println!("  Size: {} bytes", z.size);
            println!("  SHA-256: {}", z.sha256.dimmed());
            println!("  ECUs: {}", z.ecu_count);
            for m in &z.members {
                println!(
                    "    {} {} -> {} ({} bytes)",
                    m.ecu_id.bold(),
                    m.current_version,
                    m.target_version.green(),
                    m.payload_size
                );
                println!("      sha256 {}", m.sha256.dimmed());
            }
        }
    }
}

pub fn print_verification(view: &VerificationView, json: bool) {
    if json {
        print_success_json("verification", &json!({ "valid": view.is_valid(), "detail": view }));
        return;
    }

    match view {
        VerificationView::Swpg(s) => {
            println!(
                "{} ECU {} version {}: CRC and sizes OK, firmware {} bytes",
                "✓".green(),
                s.target_ecu_id,
                s.version,
                s.firmware_size
            );
            println!("  firmware sha256 {}", s.firmware_sha256.dimmed());
        }
        VerificationView::Otap(v) => {
            println!("{} {}", "Zone".bold(), v.zone_id.cyan());
            for m in &v.members {
                let mark = if m.digest_ok { "✓".green() } else { "✗".red() };
                println!(
                    "  {} {} {} ({} bytes)",
                    mark, m.ecu_id, m.target_version, m.payload_size
                );
            }
            if v.is_valid() {
                println!("{}", "All member digests match".green());
            } else {
                println!("{}", "Digest mismatch".red().bold());
            }
        }
    }
}

pub fn print_build(view: &BuildView, json: bool) {
    if json {
        print_success_json("campaign", view);
        return;
    }

    println!(
        "{} {} {}",
        "Campaign".bold(),
        view.campaign_id.cyan(),
        format!("-> {}", view.storage_dir.display()).dimmed()
    );
    for zone in &view.zones {
        match zone {
            ZoneView::Built {
                zone_id,
                ecu_ids,
                size,
                sha256,
                file,
            } => {
                println!(
                    "  {} {} [{}] {} bytes",
                    "●".green(),
                    zone_id.bold(),
                    ecu_ids.join(", "),
                    size
                );
                println!("      {} {}", file, sha256.dimmed());
            }
            ZoneView::Failed { zone_id, error } => {
                println!("  {} {} {}", "●".red(), zone_id.bold(), error.red());
            }
        }
    }
    println!(
        "  Install order: {}",
        if view.installation_sequence.is_empty() {
            "-".to_string()
        } else {
            view.installation_sequence.join(" → ")
        }
    );
    println!(
        "  Rollback: {}",
        if view.rollback_enabled { "enabled" } else { "disabled" }
    );
    println!("  Metadata: {}", view.metadata_file.display());
}

fn priority_label(priority: UpdatePriority) -> ColoredString {
    match priority {
        UpdatePriority::Critical => priority.as_str().red().bold(),
        UpdatePriority::High => priority.as_str().red(),
        UpdatePriority::Medium => priority.as_str().yellow(),
        UpdatePriority::Low => priority.as_str().normal(),
    }
}

pub fn print_check(view: &CheckView, json: bool) {
    if json {
        print_success_json("check", view);
        return;
    }

    let stats = &view.statistics;
    println!(
        "{} {}: {} ECU(s), {} need update, {} up to date, {} failed",
        "Vehicle".bold(),
        view.vin.cyan(),
        stats.total_ecus,
        stats.needs_update,
        stats.up_to_date,
        stats.failed
    );

    if view.entries.is_empty() {
        println!("{}", "  Nothing to report".yellow());
        return;
    }

    for entry in &view.entries {
        match entry {
            EcuCheckEntry::Checked(r) if r.needs_update => println!(
                "  {} {} {} -> {} [{}, {}]",
                "↑".yellow(),
                r.ecu_id.as_str().bold(),
                r.current_version,
                r.latest_version.to_string().green(),
                r.update_type.as_str(),
                priority_label(r.priority)
            ),
            EcuCheckEntry::Checked(r) => println!(
                "  {} {} {} {}",
                "✓".green(),
                r.ecu_id.as_str().bold(),
                r.current_version,
                "(latest)".dimmed()
            ),
            EcuCheckEntry::Failed { ecu_id, error } => {
                println!("  {} {} {}", "✗".red(), ecu_id.as_str().bold(), error.red())
            }
        }
    }
}

pub fn print_pack(view: &PackView, json: bool) {
    if json {
        print_success_json("package", view);
        return;
    }

    println!(
        "{} {} ({} bytes from {} byte image)",
        "Wrote".green(),
        view.file.bold(),
        view.package_size,
        view.firmware_size
    );
    println!(
        "  ECU {} {} {}",
        view.target_ecu_id, view.software_type, view.version
    );
    println!("  sha256 {}", view.sha256.dimmed());
}

pub fn print_config(config: &OtaConfig, written_to: Option<&Path>, json: bool) {
    if json {
        print_success_json("config", config);
        return;
    }

    if let Some(path) = written_to {
        println!("{} {}", "Wrote".green(), path.display());
    }
    match serde_json::to_string_pretty(config) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format config: {}", e),
    }
}
