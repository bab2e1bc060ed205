//! otactl - command-line tools for zonal OTA packages

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zonal_ota_package_format::SoftwareType;

mod commands;
mod error;
mod manifest;
mod output;

use commands::ConfigCommands;
use error::CliError;

#[derive(Parser)]
#[command(name = "otactl")]
#[command(about = "Build, inspect and check zonal OTA firmware packages")]
#[command(version)]
#[command(long_about = "otactl works on the package formats and fleet data of a zonal OTA \
update core: it decodes single-firmware (SWPG) and zonal (OTAP) packages, verifies member \
digests, builds per-zone campaign packages from a firmware manifest and reports which ECUs \
of a vehicle need an update.")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults are used when omitted)
    #[arg(long, global = true, env = "OTACTL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a package file and print its header and members
    Inspect {
        /// Package file (SWPG or OTAP)
        file: PathBuf,
    },

    /// Check payload sizes, CRC and per-member digests of a package file
    Verify {
        /// Package file (SWPG or OTAP)
        file: PathBuf,
        /// Payload compression the package was built with
        #[arg(long, value_enum)]
        compression: Option<commands::CompressionArg>,
    },

    /// Build per-zone packages for a campaign from a firmware manifest
    Build {
        /// Manifest describing firmware images and vehicles
        #[arg(short, long)]
        manifest: PathBuf,
        /// Campaign identifier
        #[arg(short, long)]
        campaign_id: String,
        /// Only target the ECUs of this vehicle
        #[arg(long)]
        vin: Option<String>,
        /// Output directory (overrides packaging.storage_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Put every target in a single package
        #[arg(long)]
        monolithic: bool,
        /// Record rollback as disabled in the campaign metadata
        #[arg(long)]
        no_rollback: bool,
    },

    /// Report which ECUs of a vehicle need an update
    Check {
        /// Manifest describing firmware images and vehicles
        #[arg(short, long)]
        manifest: PathBuf,
        /// Vehicle identification number
        #[arg(long)]
        vin: String,
        /// Only list ECUs that need an update
        #[arg(long)]
        outdated: bool,
    },

    /// Wrap a firmware image in a single-firmware (SWPG) package
    Pack {
        /// Firmware image
        firmware: PathBuf,
        /// Output package file
        #[arg(short, long)]
        out: PathBuf,
        /// Numeric id of the target ECU
        #[arg(long)]
        target_ecu: u16,
        /// Software type (app, boot, cal, cfg)
        #[arg(long = "type", default_value = "app")]
        software_type: SoftwareType,
        /// Package version, MAJOR.MINOR.PATCH[.BUILD]
        #[arg(long = "package-version")]
        package_version: String,
        /// Payload compression (defaults to the configured one)
        #[arg(long, value_enum)]
        compression: Option<commands::CompressionArg>,
    },

    /// Configuration file commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "otactl={log_level},zonal_ota_update={log_level},zonal_ota_package_format={log_level}"
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = execute_command(&cli).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);

            ExitCode::from(exit_code)
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Inspect { file } => commands::inspect::execute(file, cli.json).await,
        Commands::Verify { file, compression } => {
            let config = commands::load_config(cli.config.as_deref()).await?;
            commands::verify::execute(file, *compression, &config, cli.json).await
        }
        Commands::Build {
            manifest,
            campaign_id,
            vin,
            out,
            monolithic,
            no_rollback,
        } => {
            let config = commands::load_config(cli.config.as_deref()).await?;
            let args = commands::build::BuildArgs {
                manifest,
                campaign_id,
                vin: vin.as_deref(),
                out: out.as_deref(),
                monolithic: *monolithic,
                no_rollback: *no_rollback,
            };
            commands::build::execute(args, config, cli.json).await
        }
        Commands::Check {
            manifest,
            vin,
            outdated,
        } => {
            let config = commands::load_config(cli.config.as_deref()).await?;
            commands::check::execute(manifest, vin, *outdated, &config, cli.json).await
        }
        Commands::Pack {
            firmware,
            out,
            target_ecu,
            software_type,
            package_version,
            compression,
        } => {
            let config = commands::load_config(cli.config.as_deref()).await?;
            let args = commands::pack::PackArgs {
                firmware,
                out,
                target_ecu: *target_ecu,
                software_type: *software_type,
                version: package_version,
                compression: *compression,
            };
            commands::pack::execute(args, &config, cli.json).await
        }
        Commands::Config(cmd) => commands::config::execute(cmd, cli.json).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_inspect_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["otactl", "inspect", "pkg.bin"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(matches!(cli.command, Commands::Inspect { .. }));
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["otactl", "inspect", "pkg.bin", "--json", "-vv"])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        Ok(())
    }

    #[test]
    fn parse_verify_compression() -> TestResult {
        let cli = Cli::try_parse_from(["otactl", "verify", "pkg.bin", "--compression", "none"])?;
        assert!(matches!(
            cli.command,
            Commands::Verify {
                compression: Some(commands::CompressionArg::None),
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_build_flags() -> TestResult {
        let cli = Cli::try_parse_from([
            "otactl",
            "build",
            "-m",
            "fleet.json",
            "-c",
            "CMP-1",
            "--monolithic",
            "--no-rollback",
        ])?;
        match cli.command {
            Commands::Build {
                campaign_id,
                monolithic,
                no_rollback,
                vin,
                ..
            } => {
                assert_eq!(campaign_id, "CMP-1");
                assert!(monolithic);
                assert!(no_rollback);
                assert!(vin.is_none());
            }
            _ => return Err("expected build".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_check_requires_vin() {
        assert!(Cli::try_parse_from(["otactl", "check", "-m", "fleet.json"]).is_err());
    }

    #[test]
    fn parse_pack_software_type() -> TestResult {
        let cli = Cli::try_parse_from([
            "otactl", "pack", "fw.bin", "-o", "fw.swpg", "--target-ecu", "12", "--type", "cal",
            "--package-version", "1.2.3",
        ])?;
        assert!(matches!(
            cli.command,
            Commands::Pack {
                target_ecu: 12,
                software_type: SoftwareType::Cal,
                ..
            }
        ));
        assert!(Cli::try_parse_from([
            "otactl", "pack", "fw.bin", "-o", "x", "--target-ecu", "1", "--type", "kernel",
            "--package-version", "1.0.0",
        ])
        .is_err());
        Ok(())
    }

    #[test]
    fn parse_config_init() -> TestResult {
        let cli = Cli::try_parse_from(["otactl", "config", "init", "ota.json", "--force"])?;
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Init { force: true, .. })
        ));
        Ok(())
    }
}
