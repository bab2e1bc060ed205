//! Centralized error types for the zonal OTA update core
//!
//! This crate provides the error taxonomy shared by the package codecs, the
//! version manager, the package manager and the campaign coordinator.
//!
//! # Architecture
//!
//! The error system is organized into several modules:
//!
//! - [`common`]: Top-level error type and classification
//! - [`version`]: Version parsing and update eligibility errors
//! - [`fleet`]: ECU registry and firmware repository lookup errors
//! - [`codec`]: Binary package encode/decode errors
//! - [`package`]: Zonal package build and download errors
//! - [`campaign`]: Deployment state machine errors
//!
//! # Example
//!
//! ```
//! use zonal_ota_errors::prelude::*;
//!
//! fn check_length(bytes: &[u8]) -> Result<()> {
//!     if bytes.len() != 64 {
//!         return Err(CodecError::bad_length(64, bytes.len()).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_length(&[0u8; 64]).is_ok());
//! assert!(check_length(&[0u8; 12]).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod campaign;
pub mod codec;
pub mod common;
pub mod fleet;
pub mod package;
pub mod prelude;
pub mod version;

pub use campaign::CampaignError;
pub use codec::CodecError;
pub use common::{ErrorCategory, ErrorSeverity, OtaError};
pub use fleet::FleetError;
pub use package::PackageError;
pub use version::VersionError;

/// A specialized `Result` type for OTA core operations.
pub type Result<T> = std::result::Result<T, OtaError>;
