//! ECU model: identifiers, status, type and update eligibility

use std::fmt;

use serde::{Deserialize, Serialize};
use zonal_ota_errors::VersionError;

use crate::version::SemanticVersion;

/// Lowest valid numeric ECU address.
pub const MIN_ECU_NUMBER: u16 = 1;

/// Highest valid numeric ECU address.
pub const MAX_ECU_NUMBER: u16 = 100;

/// Validated ECU identifier of the form `ECU_001` through `ECU_100`.
///
/// The zero-padded three digit suffix makes string order agree with
/// numeric order, so the derived `Ord` is the ascending-id order used for
/// reproducible package layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EcuId(String);

impl EcuId {
    /// # Errors
    ///
    /// [`VersionError::InvalidEcuId`] if the id is malformed or its number is
    /// outside 1..=100.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let digits = s
            .strip_prefix("ECU_")
            .ok_or_else(|| VersionError::invalid_ecu_id(s))?;
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VersionError::invalid_ecu_id(s));
        }
        let n: u16 = digits
            .parse()
            .ok()
            .ok_or_else(|| VersionError::invalid_ecu_id(s))?;
        if !(MIN_ECU_NUMBER..=MAX_ECU_NUMBER).contains(&n) {
            return Err(VersionError::invalid_ecu_id(s));
        }
        Ok(Self(s.to_string()))
    }

    /// Identifier for numeric address `n`.
    pub fn from_number(n: u16) -> Result<Self, VersionError> {
        Self::parse(&format!("ECU_{n:03}"))
    }

    /// Numeric suffix, used as the header's target ECU address.
    pub fn numeric(&self) -> u16 {
        self.0
            .get(4..)
            .and_then(|d| d.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EcuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EcuId {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EcuId> for String {
    fn from(id: EcuId) -> Self {
        id.0
    }
}

impl std::str::FromStr for EcuId {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Operational status reported for an ECU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EcuStatus {
    #[default]
    Active,
    Updating,
    Error,
    Offline,
}

impl EcuStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EcuStatus::Active => "active",
            EcuStatus::Updating => "updating",
            EcuStatus::Error => "error",
            EcuStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for EcuStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Functional class of an ECU; firmware is published per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EcuType {
    /// Engine control module
    Ecm,
    /// Transmission control module
    Tcm,
    /// Body control module
    Bcm,
    /// Battery management system
    Bms,
    /// Driver assistance controller
    AdasCtl,
    Generic,
}

impl EcuType {
    pub fn as_str(self) -> &'static str {
        match self {
            EcuType::Ecm => "ECM",
            EcuType::Tcm => "TCM",
            EcuType::Bcm => "BCM",
            EcuType::Bms => "BMS",
            EcuType::AdasCtl => "ADAS_CTL",
            EcuType::Generic => "GENERIC",
        }
    }
}

impl fmt::Display for EcuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an ECU can accept from a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcuCapabilities {
    pub max_package_size: u64,
    pub supports_delta: bool,
    pub supports_compression: bool,
}

impl Default for EcuCapabilities {
    fn default() -> Self {
        Self {
            max_package_size: 16 * 1024 * 1024,
            supports_delta: false,
            supports_compression: true,
        }
    }
}

/// One electronically addressed control unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ecu {
    pub ecu_id: EcuId,
    pub ecu_type: EcuType,
    #[serde(default)]
    pub zone_id: Option<String>,
    pub current_version: SemanticVersion,
    #[serde(default)]
    pub status: EcuStatus,
    #[serde(default)]
    pub capabilities: EcuCapabilities,
}

impl Ecu {
    /// Active ECU with no zone and default capabilities.
    ///
    /// # Errors
    ///
    /// Fails if `ecu_id` or `current_version` is malformed.
    pub fn new(ecu_id: &str, ecu_type: EcuType, current_version: &str) -> Result<Self, VersionError> {
        Ok(Self {
            ecu_id: EcuId::parse(ecu_id)?,
            ecu_type,
            zone_id: None,
            current_version: SemanticVersion::parse(current_version)?,
            status: EcuStatus::Active,
            capabilities: EcuCapabilities::default(),
        })
    }

    pub fn with_zone(mut self, zone_id: impl Into<String>) -> Self {
        self.zone_id = Some(zone_id.into());
        self
    }

    pub fn with_status(mut self, status: EcuStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_capabilities(mut self, capabilities: EcuCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Whether an update to `target` may be accepted.
    ///
    /// The ECU must be active. A major-version decrease is then reported as
    /// [`VersionError::MajorDowngradeRejected`] ahead of the generic
    /// "not newer" check.
    pub fn can_update_to(&self, target: &SemanticVersion) -> Result<(), VersionError> {
        if self.status != EcuStatus::Active {
            return Err(VersionError::not_active(self.ecu_id.as_str(), self.status.as_str()));
        }
        if target.major < self.current_version.major {
            return Err(VersionError::MajorDowngradeRejected {
                current: self.current_version.to_string(),
                target: target.to_string(),
            });
        }
        if *target <= self.current_version {
            return Err(VersionError::TargetNotNewer {
                current: self.current_version.to_string(),
                target: target.to_string(),
            });
        }
        Ok(())
    }

    pub fn needs_update(&self, latest: &SemanticVersion) -> bool {
        self.current_version < *latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecu_id_bounds() -> Result<(), VersionError> {
        assert_eq!(EcuId::parse("ECU_001")?.numeric(), 1);
        assert_eq!(EcuId::parse("ECU_100")?.numeric(), 100);
        for bad in ["ECU_000", "ECU_101", "ECU_999", "ECU_1", "ECU_0010", "ecu_001", "ECU-001", "ECU_0x1", ""] {
            assert_eq!(EcuId::parse(bad), Err(VersionError::invalid_ecu_id(bad)));
        }
        Ok(())
    }

    #[test]
    fn test_ecu_id_order_matches_numeric() -> Result<(), VersionError> {
        let mut ids = vec![EcuId::from_number(10)?, EcuId::from_number(2)?, EcuId::from_number(100)?];
        ids.sort();
        let numbers: Vec<u16> = ids.iter().map(EcuId::numeric).collect();
        assert_eq!(numbers, vec![2, 10, 100]);
        Ok(())
    }

    #[test]
    fn test_ecu_construction_rejects_bad_id() {
        assert!(matches!(
            Ecu::new("ECU_101", EcuType::Ecm, "1.0.0"),
            Err(VersionError::InvalidEcuId(_))
        ));
    }

    #[test]
    fn test_can_update_to() -> Result<(), VersionError> {
        let ecu = Ecu::new("ECU_005", EcuType::Bms, "2.3.4")?;
        assert_eq!(ecu.can_update_to(&SemanticVersion::new(2, 3, 5)), Ok(()));
        assert!(matches!(
            ecu.can_update_to(&SemanticVersion::new(2, 3, 4)),
            Err(VersionError::TargetNotNewer { .. })
        ));
        assert!(matches!(
            ecu.can_update_to(&SemanticVersion::new(2, 1, 0)),
            Err(VersionError::TargetNotNewer { .. })
        ));
        assert!(matches!(
            ecu.can_update_to(&SemanticVersion::new(1, 9, 9)),
            Err(VersionError::MajorDowngradeRejected { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_inactive_ecu() -> Result<(), VersionError> {
        let ecu = Ecu::new("ECU_005", EcuType::Bms, "2.3.4")?.with_status(EcuStatus::Offline);
        assert!(matches!(
            ecu.can_update_to(&SemanticVersion::new(3, 0, 0)),
            Err(VersionError::EcuNotActive { .. })
        ));
        // Status wins over a major downgrade
        assert!(matches!(
            ecu.can_update_to(&SemanticVersion::new(1, 0, 0)),
            Err(VersionError::EcuNotActive { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_serde_shape() -> Result<(), Box<dyn std::error::Error>> {
        let ecu = Ecu::new("ECU_042", EcuType::AdasCtl, "1.0.0")?.with_zone("ZONE_FRONT");
        let json = serde_json::to_value(&ecu)?;
        assert_eq!(json["ecu_id"], "ECU_042");
        assert_eq!(json["ecu_type"], "ADAS_CTL");
        assert_eq!(json["status"], "active");
        assert_eq!(json["current_version"], "1.0.0");

        let bad = r#"{"ecu_id":"ECU_200","ecu_type":"ECM","current_version":"1.0.0"}"#;
        assert!(serde_json::from_str::<Ecu>(bad).is_err());
        Ok(())
    }
}
