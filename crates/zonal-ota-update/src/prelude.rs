//! Convenience re-exports for common OTA core types

pub use crate::campaign::{
    CampaignCoordinator, CampaignRepository, CampaignSummary, DeploymentRepository,
    DeploymentState, DeploymentStatus, EventOutcome, VehicleEvent, VehicleNotifier,
};
pub use crate::config::{CampaignConfig, CompressionConfig, OtaConfig, PackagingConfig};
pub use crate::download::{ByteRange, DownloadService, PackageSlice};
pub use crate::ecu::{Ecu, EcuCapabilities, EcuId, EcuStatus, EcuType};
pub use crate::firmware::{
    EcuRegistry, EcuZoneField, FirmwareArtifact, FirmwareRepository, ZoneLookup,
};
pub use crate::metadata::{CampaignMetadata, CampaignPackage};
pub use crate::package_manager::{
    BuildReport, PackageManager, PackageMetadata, ZoneBuildOutcome, partition_by_zone,
    verify_zonal_package,
};
pub use crate::signing::{PackageSigner, PackageVerifier};
pub use crate::storage::PackageStore;
pub use crate::version::{ChangeType, SemanticVersion, compare_versions, latest_version};
pub use crate::version_manager::{
    EcuCheckEntry, FleetCheckReport, UpdatePriority, UpdateStatistics, VersionCheckResult,
    VersionManager, VersionPolicy,
};
pub use zonal_ota_errors::{
    CampaignError, CodecError, FleetError, OtaError, PackageError, VersionError,
};
