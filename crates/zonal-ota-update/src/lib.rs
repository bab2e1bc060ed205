//! Zonal OTA update core
//!
//! This crate assembles firmware updates for vehicles whose ECUs sit behind
//! zonal gateways and tracks their rollout:
//! - Semantic versions and update-priority policy
//! - Fleet version checks against the firmware repository
//! - One package per zonal gateway, built concurrently and stored atomically
//! - Per-vehicle campaign deployment state machine
//! - Resumable byte-range downloads of built packages
//!
//! # Architecture
//!
//! - [`version`] and [`ecu`]: value types and update eligibility
//! - [`version_manager`]: latest-version lookups and priority scoring
//! - [`package_manager`]: zone partitioning and package builds
//! - [`campaign`]: deployment state machine and its collaborators
//! - [`download`]: range requests over stored packages
//! - [`firmware`]: collaborator traits for the registry and repository
//! - [`memory`]: in-memory collaborators
//! - [`config`]: explicit configuration passed to constructors
//!
//! # Example
//!
//! ```ignore
//! use zonal_ota_update::prelude::*;
//!
//! # async fn example(firmware: std::sync::Arc<dyn FirmwareRepository>, targets: Vec<Ecu>) -> anyhow::Result<()> {
//! let config = OtaConfig::load_from_path("ota.json").await?;
//! let store = PackageStore::open(&config.packaging.storage_dir).await?;
//! let manager = PackageManager::new(config.packaging, firmware, store);
//!
//! let build = manager
//!     .create_campaign_packages("CMP-2025-01", &targets, &EcuZoneField, true)
//!     .await?;
//! for (zone, err) in build.report.failed() {
//!     eprintln!("{zone}: {err}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod campaign;
pub mod config;
pub mod download;
pub mod ecu;
pub mod firmware;
pub mod memory;
pub mod metadata;
pub mod package_manager;
pub mod prelude;
pub mod signing;
pub mod storage;
pub mod version;
pub mod version_manager;

pub use campaign::{CampaignCoordinator, DeploymentState, DeploymentStatus, VehicleEvent};
pub use config::OtaConfig;
pub use download::{ByteRange, DownloadService};
pub use ecu::{Ecu, EcuId, EcuStatus, EcuType};
pub use package_manager::{BuildReport, PackageManager, ZoneBuildOutcome};
pub use storage::PackageStore;
pub use version::SemanticVersion;
pub use version_manager::{VersionManager, VersionPolicy};
pub use zonal_ota_errors::{OtaError, Result};
