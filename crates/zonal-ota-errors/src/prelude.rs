//! Prelude module for convenient error handling imports.
//!
//! # Example
//!
//! ```
//! use zonal_ota_errors::prelude::*;
//!
//! fn require_vin(vin: &str) -> Result<&str> {
//!     if vin.is_empty() {
//!         return Err(FleetError::UnknownVehicle(vin.to_string()).into());
//!     }
//!     Ok(vin)
//! }
//!
//! assert!(require_vin("").is_err());
//! ```

pub use crate::{
    Result,
    campaign::CampaignError,
    codec::CodecError,
    common::{ErrorCategory, ErrorSeverity, OtaError},
    fleet::FleetError,
    package::PackageError,
    version::VersionError,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_result_converts_domain_errors() {
        fn deploy(campaign_id: &str) -> Result<()> {
            Err(CampaignError::UnknownCampaign(campaign_id.to_string()).into())
        }
        let err = deploy("CMP-9").err();
        assert!(matches!(
            err,
            Some(OtaError::Campaign(CampaignError::UnknownCampaign(ref c))) if c == "CMP-9"
        ));
    }
}
