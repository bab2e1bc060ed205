//! Per-ECU update checks and update prioritisation
//!
//! The manager answers "does this ECU need an update, and how urgently" by
//! comparing its installed version against the newest firmware published for
//! its type. Latest versions are cached per type until [`VersionManager::clear_cache`].

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zonal_ota_errors::{FleetError, OtaError};

use crate::ecu::{Ecu, EcuId, EcuType};
use crate::firmware::{EcuRegistry, FirmwareRepository};
use crate::version::{ChangeType, SemanticVersion, change_type};

/// Priority thresholds and fan-out limits.
///
/// The security-patch and version-gap thresholds are heuristics, kept as
/// policy values rather than constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionPolicy {
    pub major_base_priority: u8,
    pub minor_base_priority: u8,
    pub patch_base_priority: u8,
    /// A patch update whose target patch component is at least this is
    /// treated as security relevant.
    pub security_patch_threshold: u32,
    pub security_patch_priority: u8,
    /// Escalate by one level when the weighted version gap exceeds this.
    pub version_gap_threshold: i64,
    pub max_priority: u8,
    /// Maximum ECU checks in flight during a fleet check.
    pub check_concurrency: usize,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            major_base_priority: 2,
            minor_base_priority: 1,
            patch_base_priority: 0,
            security_patch_threshold: 10,
            security_patch_priority: 2,
            version_gap_threshold: 50,
            max_priority: 3,
            check_concurrency: 8,
        }
    }
}

/// Urgency of an update.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePriority {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl UpdatePriority {
    /// Level 0..=3; anything above 3 saturates to `Critical`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => UpdatePriority::Low,
            1 => UpdatePriority::Medium,
            2 => UpdatePriority::High,
            _ => UpdatePriority::Critical,
        }
    }

    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpdatePriority::Low => "low",
            UpdatePriority::Medium => "medium",
            UpdatePriority::High => "high",
            UpdatePriority::Critical => "critical",
        }
    }
}

impl fmt::Display for UpdatePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted distance between two versions: `Δmajor*100 + Δminor*10 + Δpatch`.
pub fn version_gap(current: &SemanticVersion, latest: &SemanticVersion) -> i64 {
    let d = |a: u32, b: u32| i64::from(b) - i64::from(a);
    d(current.major, latest.major) * 100
        + d(current.minor, latest.minor) * 10
        + d(current.patch, latest.patch)
}

/// Priority for moving from `current` to `latest` under `policy`.
///
/// Returns `Low` when no update is needed.
pub fn update_priority(
    policy: &VersionPolicy,
    current: &SemanticVersion,
    latest: &SemanticVersion,
) -> UpdatePriority {
    if current >= latest {
        return UpdatePriority::Low;
    }
    let base = match change_type(current, latest) {
        ChangeType::Major => policy.major_base_priority,
        ChangeType::Minor => policy.minor_base_priority,
        ChangeType::Patch if latest.patch >= policy.security_patch_threshold => {
            policy.security_patch_priority
        }
        ChangeType::Patch => policy.patch_base_priority,
        ChangeType::None => 0,
    };
    let escalated = if version_gap(current, latest) > policy.version_gap_threshold {
        base.saturating_add(1)
    } else {
        base
    };
    UpdatePriority::from_level(escalated.min(policy.max_priority))
}

/// Outcome of checking one ECU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionCheckResult {
    pub ecu_id: EcuId,
    pub ecu_type: EcuType,
    pub current_version: SemanticVersion,
    pub latest_version: SemanticVersion,
    pub needs_update: bool,
    pub update_type: ChangeType,
    pub priority: UpdatePriority,
    pub version_gap: i64,
}

/// One line of a fleet check: a result, or the isolated failure for that ECU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EcuCheckEntry {
    Checked(VersionCheckResult),
    Failed { ecu_id: EcuId, error: String },
}

impl EcuCheckEntry {
    pub fn ecu_id(&self) -> &EcuId {
        match self {
            EcuCheckEntry::Checked(r) => &r.ecu_id,
            EcuCheckEntry::Failed { ecu_id, .. } => ecu_id,
        }
    }

    pub fn result(&self) -> Option<&VersionCheckResult> {
        match self {
            EcuCheckEntry::Checked(r) => Some(r),
            EcuCheckEntry::Failed { .. } => None,
        }
    }

    fn sort_key(&self) -> (bool, Reverse<UpdatePriority>, &EcuId) {
        match self {
            EcuCheckEntry::Checked(r) => (false, Reverse(r.priority), &r.ecu_id),
            EcuCheckEntry::Failed { ecu_id, .. } => (true, Reverse(UpdatePriority::Low), ecu_id),
        }
    }
}

/// Result of checking every ECU in one vehicle.
///
/// Entries are ordered by priority descending, ties by ascending ECU id;
/// failed entries follow all checked ones in ECU id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetCheckReport {
    pub vin: String,
    pub entries: Vec<EcuCheckEntry>,
}

impl FleetCheckReport {
    pub fn results(&self) -> impl Iterator<Item = &VersionCheckResult> {
        self.entries.iter().filter_map(EcuCheckEntry::result)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&EcuId, &str)> {
        self.entries.iter().filter_map(|e| match e {
            EcuCheckEntry::Failed { ecu_id, error } => Some((ecu_id, error.as_str())),
            EcuCheckEntry::Checked(_) => None,
        })
    }
}

/// Per-band counts of ECUs needing an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Aggregate figures for one vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatistics {
    pub total_ecus: usize,
    pub needs_update: usize,
    pub up_to_date: usize,
    pub failed: usize,
    pub by_update_type: BTreeMap<ChangeType, usize>,
    pub by_priority: PriorityBreakdown,
}

/// Version manager with a read-through latest-version cache.
pub struct VersionManager {
    policy: VersionPolicy,
    firmware: Arc<dyn FirmwareRepository>,
    registry: Arc<dyn EcuRegistry>,
    latest_cache: RwLock<HashMap<EcuType, SemanticVersion>>,
}

impl VersionManager {
    pub fn new(
        policy: VersionPolicy,
        firmware: Arc<dyn FirmwareRepository>,
        registry: Arc<dyn EcuRegistry>,
    ) -> Self {
        Self {
            policy,
            firmware,
            registry,
            latest_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// Latest published version for `ecu_type`.
    ///
    /// Concurrent misses may each fetch; the first value stored wins and is
    /// what every caller sees afterwards.
    pub async fn latest_for_type(&self, ecu_type: EcuType) -> Result<SemanticVersion, FleetError> {
        if let Some(v) = self.latest_cache.read().await.get(&ecu_type) {
            debug!(ecu_type = %ecu_type, version = %v, "Latest-version cache hit");
            return Ok(*v);
        }

        debug!(ecu_type = %ecu_type, "Latest-version cache miss");
        let fetched = self.firmware.latest_artifact(ecu_type).await?.target_version;

        let mut cache = self.latest_cache.write().await;
        Ok(*cache.entry(ecu_type).or_insert(fetched))
    }

    /// Drop every cached latest version.
    pub async fn clear_cache(&self) {
        self.latest_cache.write().await.clear();
        info!("Cleared latest-version cache");
    }

    /// Pure evaluation of `ecu` against `latest`.
    pub fn evaluate(&self, ecu: &Ecu, latest: SemanticVersion) -> VersionCheckResult {
        let needs_update = ecu.needs_update(&latest);
        let (update_type, priority) = if needs_update {
            (
                change_type(&ecu.current_version, &latest),
                update_priority(&self.policy, &ecu.current_version, &latest),
            )
        } else {
            (ChangeType::None, UpdatePriority::Low)
        };

        VersionCheckResult {
            ecu_id: ecu.ecu_id.clone(),
            ecu_type: ecu.ecu_type,
            current_version: ecu.current_version,
            latest_version: latest,
            needs_update,
            update_type,
            priority,
            version_gap: version_gap(&ecu.current_version, &latest),
        }
    }

    /// Check one ECU by id.
    pub async fn check_ecu(&self, ecu_id: &EcuId) -> Result<VersionCheckResult, FleetError> {
        let ecu = self.registry.get_ecu(ecu_id).await?;
        let latest = self.latest_for_type(ecu.ecu_type).await?;
        Ok(self.evaluate(&ecu, latest))
    }

    /// Check every ECU of vehicle `vin` with bounded fan-out.
    ///
    /// # Errors
    ///
    /// Only a failure to list the vehicle's ECUs aborts the batch; per-ECU
    /// failures become [`EcuCheckEntry::Failed`] entries.
    pub async fn check_fleet(&self, vin: &str) -> Result<FleetCheckReport, FleetError> {
        let ecu_ids = self.registry.vehicle_ecus(vin).await?;
        let limit = self.policy.check_concurrency.max(1);

        let mut entries: Vec<EcuCheckEntry> = stream::iter(ecu_ids)
            .map(|ecu_id| async move {
                match self.check_ecu(&ecu_id).await {
                    Ok(result) => EcuCheckEntry::Checked(result),
                    Err(e) => {
                        warn!(vin, ecu_id = %ecu_id, error = %e, "ECU version check failed");
                        EcuCheckEntry::Failed {
                            ecu_id,
                            error: e.to_string(),
                        }
                    }
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let report = FleetCheckReport {
            vin: vin.to_string(),
            entries,
        };
        info!(
            vin,
            checked = report.results().count(),
            outdated = report.results().filter(|r| r.needs_update).count(),
            failed = report.failures().count(),
            "Fleet version check complete"
        );
        Ok(report)
    }

    /// ECUs of `vin` that need an update, highest priority first.
    pub async fn outdated_ecus(&self, vin: &str) -> Result<Vec<VersionCheckResult>, FleetError> {
        let report = self.check_fleet(vin).await?;
        Ok(report
            .entries
            .into_iter()
            .filter_map(|e| match e {
                EcuCheckEntry::Checked(r) if r.needs_update => Some(r),
                _ => None,
            })
            .collect())
    }

    /// Check an arbitrary set of ECUs; failed checks are logged and omitted.
    pub async fn bulk_check(&self, ecu_ids: &[EcuId]) -> HashMap<EcuId, VersionCheckResult> {
        let limit = self.policy.check_concurrency.max(1);
        stream::iter(ecu_ids)
            .map(|ecu_id| async move { (ecu_id, self.check_ecu(ecu_id).await) })
            .buffer_unordered(limit)
            .filter_map(|(ecu_id, outcome)| async move {
                match outcome {
                    Ok(result) => Some((ecu_id.clone(), result)),
                    Err(e) => {
                        warn!(ecu_id = %ecu_id, error = %e, "Dropping failed check from bulk result");
                        None
                    }
                }
            })
            .collect()
            .await
    }

    /// Totals and breakdowns for vehicle `vin`.
    pub async fn update_statistics(&self, vin: &str) -> Result<UpdateStatistics, FleetError> {
        let report = self.check_fleet(vin).await?;
        let mut stats = UpdateStatistics {
            total_ecus: report.entries.len(),
            ..UpdateStatistics::default()
        };

        for entry in &report.entries {
            let EcuCheckEntry::Checked(r) = entry else {
                stats.failed += 1;
                continue;
            };
            if !r.needs_update {
                stats.up_to_date += 1;
                continue;
            }
            stats.needs_update += 1;
            *stats.by_update_type.entry(r.update_type).or_default() += 1;
            match r.priority {
                UpdatePriority::Critical => stats.by_priority.critical += 1,
                UpdatePriority::High => stats.by_priority.high += 1,
                UpdatePriority::Medium => stats.by_priority.medium += 1,
                UpdatePriority::Low => stats.by_priority.low += 1,
            }
        }
        Ok(stats)
    }

    /// Validate `version` and record it as installed on `ecu_id`.
    pub async fn record_installed_version(
        &self,
        ecu_id: &EcuId,
        version: &str,
    ) -> Result<(), OtaError> {
        let parsed = SemanticVersion::parse(version)?;
        self.registry.record_version(ecu_id, parsed).await?;
        info!(ecu_id = %ecu_id, version = %parsed, "Recorded installed version");
        Ok(())
    }
}
