//! Snapshot tests for error message formatting.
//!
//! Operators grep logs for these messages, so they must stay stable.

use zonal_ota_errors::{
    campaign::CampaignError, codec::CodecError, common::OtaError, fleet::FleetError,
    package::PackageError, version::VersionError,
};

mod version_error_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_invalid_format() {
        assert_snapshot!(
            VersionError::invalid_format("1.2.x").to_string(),
            @"Invalid version format: '1.2.x' (expected MAJOR.MINOR.PATCH)"
        );
    }

    #[test]
    fn test_major_downgrade() {
        let err = VersionError::MajorDowngradeRejected {
            current: "2.0.0".into(),
            target: "1.9.0".into(),
        };
        assert_snapshot!(err.to_string(), @"Major version downgrade rejected: 2.0.0 -> 1.9.0");
    }

    #[test]
    fn test_not_active() {
        assert_snapshot!(
            VersionError::not_active("ECU_007", "updating").to_string(),
            @"ECU ECU_007 is not active (status: updating)"
        );
    }
}

mod codec_error_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_bad_length() {
        assert_snapshot!(
            CodecError::bad_length(64, 12).to_string(),
            @"Bad length: expected 64 bytes, got 12"
        );
    }

    #[test]
    fn test_bad_magic() {
        let err = CodecError::BadMagic {
            expected: 0x5357_5047,
            actual: 0x1234,
        };
        assert_snapshot!(err.to_string(), @"Bad magic: expected 0x53575047, got 0x00001234");
    }
}

mod campaign_error_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_unknown_target() {
        assert_snapshot!(
            CampaignError::unknown_target("CMP-1", "VIN0001").to_string(),
            @"Unknown deployment target: campaign CMP-1, vehicle VIN0001"
        );
    }

    #[test]
    fn test_invalid_transition() {
        assert_snapshot!(
            CampaignError::invalid_transition("CMP-1", "VIN0001", "Completed", "ota_error")
                .to_string(),
            @"Invalid transition for campaign CMP-1, vehicle VIN0001: ota_error in state Completed"
        );
    }
}

mod wrapped_error_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_package_wraps_fleet() {
        let err: OtaError = PackageError::from(FleetError::UnknownEcu("ECU_050".into())).into();
        assert_snapshot!(err.to_string(), @"Package error: Unknown ECU: ECU_050");
    }

    #[test]
    fn test_zone_build_failed() {
        let err: OtaError = PackageError::zone_failed("UNASSIGNED", "digest mismatch").into();
        assert_snapshot!(
            err.to_string(),
            @"Package error: Failed to build package for zone UNASSIGNED: digest mismatch"
        );
    }
}
