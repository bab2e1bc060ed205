//! Integration tests for version checks, zonal package builds, campaign rollout and downloads

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use tracing_test::traced_test;
use zonal_ota_update::campaign::{CampaignResponse, EventError, ReportedStatus};
use zonal_ota_update::memory::{
    InMemoryCampaignStore, InMemoryEcuRegistry, InMemoryFirmwareRepository, RecordingNotifier,
    SentMessage,
};
use zonal_ota_package_format::{
    CompressedPayload, CompressionAlgorithm, NoCompression, PayloadCompressor,
};
use zonal_ota_update::package_manager::UNASSIGNED_ZONE;
use zonal_ota_update::prelude::*;

fn image(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 251) as u8)).collect()
}

struct Fleet {
    firmware: Arc<InMemoryFirmwareRepository>,
    registry: Arc<InMemoryEcuRegistry>,
    targets: Vec<Ecu>,
}

fn fleet() -> Result<Fleet> {
    let firmware = Arc::new(InMemoryFirmwareRepository::new());
    firmware.publish(EcuType::Ecm, SemanticVersion::new(2, 1, 0), image(1, 4096));
    firmware.publish(EcuType::Tcm, SemanticVersion::new(1, 4, 0), image(2, 2048));
    firmware.publish(EcuType::Bcm, SemanticVersion::new(3, 0, 12), image(3, 1024));

    let targets = vec![
        Ecu::new("ECU_001", EcuType::Ecm, "1.0.0")?.with_zone("ZONE_FRONT"),
        Ecu::new("ECU_002", EcuType::Tcm, "1.3.0")?.with_zone("ZONE_FRONT"),
        Ecu::new("ECU_010", EcuType::Bcm, "3.0.0")?.with_zone("ZONE_REAR"),
        Ecu::new("ECU_020", EcuType::Bcm, "3.0.12")?,
    ];

    let registry = Arc::new(InMemoryEcuRegistry::new());
    let mut vehicle = targets.clone();
    vehicle.push(Ecu::new("ECU_030", EcuType::Bms, "1.0.0")?.with_zone("ZONE_REAR"));
    registry.insert_vehicle("VIN0001", vehicle);

    Ok(Fleet {
        firmware,
        registry,
        targets,
    })
}

async fn package_manager(fleet: &Fleet, dir: &TempDir) -> Result<PackageManager> {
    let config = PackagingConfig {
        storage_dir: dir.path().join("packages"),
        ..PackagingConfig::default()
    };
    let store = PackageStore::open(&config.storage_dir).await?;
    Ok(PackageManager::new(config, fleet.firmware.clone(), store))
}

fn ids(results: &[VersionCheckResult]) -> Vec<&str> {
    results.iter().map(|r| r.ecu_id.as_str()).collect()
}

#[tokio::test]
async fn test_fleet_check_orders_by_priority_and_isolates_failures() -> Result<()> {
    let fleet = fleet()?;
    let manager = VersionManager::new(
        VersionPolicy::default(),
        fleet.firmware.clone(),
        fleet.registry.clone(),
    );

    let report = manager.check_fleet("VIN0001").await?;
    let order: Vec<&str> = report.entries.iter().map(|e| e.ecu_id().as_str()).collect();
    assert_eq!(order, vec!["ECU_001", "ECU_010", "ECU_002", "ECU_020", "ECU_030"]);

    let priorities: Vec<UpdatePriority> = report.results().map(|r| r.priority).collect();
    assert_eq!(
        priorities,
        vec![
            UpdatePriority::Critical,
            UpdatePriority::High,
            UpdatePriority::Medium,
            UpdatePriority::Low
        ]
    );

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0.as_str(), "ECU_030");
    assert!(failures[0].1.contains("BMS"));
    Ok(())
}

#[tokio::test]
async fn test_outdated_statistics_and_bulk_check() -> Result<()> {
    let fleet = fleet()?;
    let manager = VersionManager::new(
        VersionPolicy::default(),
        fleet.firmware.clone(),
        fleet.registry.clone(),
    );

    let outdated = manager.outdated_ecus("VIN0001").await?;
    assert_eq!(ids(&outdated), vec!["ECU_001", "ECU_010", "ECU_002"]);

    let stats = manager.update_statistics("VIN0001").await?;
    assert_eq!(stats.total_ecus, 5);
    assert_eq!(stats.needs_update, 3);
    assert_eq!(stats.up_to_date, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.by_priority.critical, 1);
    assert_eq!(stats.by_update_type.get(&ChangeType::Major), Some(&1));

    let wanted = [
        EcuId::parse("ECU_001")?,
        EcuId::parse("ECU_030")?,
        EcuId::parse("ECU_099")?,
    ];
    let bulk = manager.bulk_check(&wanted).await;
    assert_eq!(bulk.len(), 1);
    assert!(bulk.contains_key(&wanted[0]));
    Ok(())
}

#[tokio::test]
async fn test_record_installed_version_updates_registry() -> Result<()> {
    let fleet = fleet()?;
    let manager = VersionManager::new(
        VersionPolicy::default(),
        fleet.firmware.clone(),
        fleet.registry.clone(),
    );
    let id = EcuId::parse("ECU_002")?;

    manager.record_installed_version(&id, "1.4.0").await?;
    assert!(!manager.check_ecu(&id).await?.needs_update);

    let err = manager.record_installed_version(&id, "1.4").await;
    assert!(matches!(
        err,
        Err(OtaError::Version(VersionError::InvalidVersionFormat(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn test_latest_cache_survives_new_publish_until_cleared() -> Result<()> {
    let fleet = fleet()?;
    let manager = VersionManager::new(
        VersionPolicy::default(),
        fleet.firmware.clone(),
        fleet.registry.clone(),
    );

    assert_eq!(
        manager.latest_for_type(EcuType::Tcm).await?,
        SemanticVersion::new(1, 4, 0)
    );
    fleet
        .firmware
        .publish(EcuType::Tcm, SemanticVersion::new(1, 5, 0), image(9, 16));
    assert_eq!(
        manager.latest_for_type(EcuType::Tcm).await?,
        SemanticVersion::new(1, 4, 0)
    );

    manager.clear_cache().await;
    assert_eq!(
        manager.latest_for_type(EcuType::Tcm).await?,
        SemanticVersion::new(1, 5, 0)
    );
    Ok(())
}

#[tokio::test]
async fn test_zonal_build_writes_verifiable_packages() -> Result<()> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let pm = package_manager(&fleet, &dir).await?;

    let build = pm
        .create_campaign_packages("CMP-1", &fleet.targets, &EcuZoneField, true)
        .await?;
    assert!(build.report.is_complete());

    let zones: Vec<&str> = build.report.zones.iter().map(|z| z.zone_id()).collect();
    assert_eq!(zones, vec![UNASSIGNED_ZONE, "ZONE_FRONT", "ZONE_REAR"]);
    assert_eq!(
        build.metadata.installation_sequence,
        vec![UNASSIGNED_ZONE, "ZONE_FRONT", "ZONE_REAR"]
    );

    for meta in build.report.built() {
        let bytes = tokio::fs::read(&meta.file_reference).await?;
        assert_eq!(bytes.len() as u64, meta.total_size);

        let check = verify_zonal_package(&bytes, pm.compressor())?;
        assert!(check.is_valid());
        assert_eq!(check.zone_id, meta.zone_id);
        assert_eq!(check.content_hash, meta.content_hash);
        let members: Vec<&str> = check.members.iter().map(|m| m.ecu_id.as_str()).collect();
        let expected: Vec<&str> = meta.ecu_ids.iter().map(EcuId::as_str).collect();
        assert_eq!(members, expected);
    }

    let front = build
        .report
        .built()
        .find(|m| m.zone_id == "ZONE_FRONT")
        .map(|m| m.ecu_ids.clone());
    assert_eq!(
        front,
        Some(vec![EcuId::parse("ECU_001")?, EcuId::parse("ECU_002")?])
    );

    let loaded = pm.load_campaign_metadata("CMP-1").await?;
    assert_eq!(loaded, build.metadata);
    assert_eq!(loaded.target_ecus.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_build_is_deterministic() -> Result<()> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let pm = package_manager(&fleet, &dir).await?;

    let mut reversed = fleet.targets.clone();
    reversed.reverse();

    let first = pm.build_zonal_packages("CMP-A", &fleet.targets, &EcuZoneField).await;
    let second = pm.build_zonal_packages("CMP-B", &reversed, &EcuZoneField).await;

    let hashes = |r: &BuildReport| -> Vec<(String, String)> {
        r.built()
            .map(|m| (m.zone_id.clone(), m.content_hash.clone()))
            .collect()
    };
    assert_eq!(hashes(&first), hashes(&second));
    Ok(())
}

/// Holds each compression until a second one is running, or a timeout passes.
#[derive(Default)]
struct OverlapCompressor {
    state: Mutex<(usize, usize)>,
    overlap: Condvar,
}

impl OverlapCompressor {
    fn peak(&self) -> usize {
        self.state.lock().map(|s| s.1).unwrap_or(0)
    }
}

impl PayloadCompressor for OverlapCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::None
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedPayload, CodecError> {
        if let Ok(mut state) = self.state.lock() {
            state.0 += 1;
            state.1 = state.1.max(state.0);
            self.overlap.notify_all();
            if let Ok((mut state, _)) =
                self.overlap
                    .wait_timeout_while(state, Duration::from_secs(5), |s| s.1 < 2)
            {
                state.0 -= 1;
            }
        }
        NoCompression.compress(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        NoCompression.decompress(data)
    }
}

#[tokio::test]
async fn test_zone_compression_runs_concurrently() -> Result<()> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let compressor = Arc::new(OverlapCompressor::default());
    let pm = package_manager(&fleet, &dir)
        .await?
        .with_compressor(compressor.clone());

    let report = pm.build_zonal_packages("CMP-C", &fleet.targets, &EcuZoneField).await;
    assert!(report.is_complete());
    assert_eq!(report.built().count(), 3);
    // A blocking compression in one zone must not stall the others
    assert!(compressor.peak() >= 2, "peak concurrency {}", compressor.peak());
    Ok(())
}

#[tokio::test]
async fn test_monolithic_mode_builds_single_package() -> Result<()> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let config = PackagingConfig {
        storage_dir: dir.path().to_path_buf(),
        zonal_optimization: false,
        ..PackagingConfig::default()
    };
    let store = PackageStore::open(&config.storage_dir).await?;
    let pm = PackageManager::new(config, fleet.firmware.clone(), store);

    let report = pm.build_zonal_packages("CMP-M", &fleet.targets, &EcuZoneField).await;
    let built: Vec<_> = report.built().collect();
    assert_eq!(built.len(), 1);
    assert_eq!(built[0].zone_id, "ALL");
    assert_eq!(built[0].ecu_count, 4);
    Ok(())
}

#[tokio::test]
#[traced_test]
async fn test_zone_failure_is_isolated() -> Result<()> {
    let fleet = fleet()?;
    fleet
        .firmware
        .tamper("firmware/BCM/3.0.12.bin", b"corrupted".to_vec());
    let dir = TempDir::new()?;
    let pm = package_manager(&fleet, &dir).await?;

    let build = pm
        .create_campaign_packages("CMP-2", &fleet.targets, &EcuZoneField, false)
        .await?;

    let built: Vec<&str> = build.report.built().map(|m| m.zone_id.as_str()).collect();
    assert_eq!(built, vec!["ZONE_FRONT"]);

    let failed: Vec<(&str, &PackageError)> = build.report.failed().collect();
    assert_eq!(failed.len(), 2);
    for (zone, err) in failed {
        assert!(matches!(
            err,
            PackageError::ZonePackageBuildFailed { zone_id, reason }
                if zone_id == zone && reason.contains("digest mismatch")
        ));
    }

    assert_eq!(build.metadata.installation_sequence, vec!["ZONE_FRONT"]);
    assert!(!dir.path().join("packages").join("CMP-2_ZONE_REAR.bin").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_firmware_type_fails_only_its_zone() -> Result<()> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let pm = package_manager(&fleet, &dir).await?;

    let mut targets = fleet.targets.clone();
    targets.push(Ecu::new("ECU_040", EcuType::AdasCtl, "1.0.0")?.with_zone("ZONE_ADAS"));

    let report = pm.build_zonal_packages("CMP-3", &targets, &EcuZoneField).await;
    assert_eq!(report.built().count(), 3);
    let failed: Vec<&str> = report.failed().map(|(z, _)| z).collect();
    assert_eq!(failed, vec!["ZONE_ADAS"]);
    Ok(())
}

struct Rollout {
    coordinator: CampaignCoordinator,
    notifier: Arc<RecordingNotifier>,
    _dir: TempDir,
}

async fn rollout(rollback_enabled: bool) -> Result<Rollout> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let pm = package_manager(&fleet, &dir).await?;
    let build = pm
        .create_campaign_packages("CMP-9", &fleet.targets, &EcuZoneField, rollback_enabled)
        .await?;

    let store = Arc::new(InMemoryCampaignStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator = CampaignCoordinator::new(
        CampaignConfig::default(),
        store.clone(),
        store,
        notifier.clone(),
    );
    coordinator.create_campaign(build.metadata).await?;
    Ok(Rollout {
        coordinator,
        notifier,
        _dir: dir,
    })
}

fn ok(s: &str) -> ReportedStatus {
    ReportedStatus::new(s)
}

fn lifecycle() -> Vec<VehicleEvent> {
    let c = || "CMP-9".to_string();
    vec![
        VehicleEvent::OtaCampaignResponse {
            campaign_id: c(),
            status: CampaignResponse::Accepted,
        },
        VehicleEvent::OtaDownloadProgress {
            campaign_id: c(),
            percentage: 42.5,
        },
        VehicleEvent::OtaDownloadComplete {
            campaign_id: c(),
            status: ok("success"),
        },
        VehicleEvent::OtaInstallationStart { campaign_id: c() },
        VehicleEvent::OtaInstallationComplete {
            campaign_id: c(),
            overall_status: ok("success"),
        },
        VehicleEvent::OtaVerificationStart { campaign_id: c() },
        VehicleEvent::OtaVerificationComplete {
            campaign_id: c(),
            verification_status: ok("passed"),
        },
    ]
}

#[tokio::test]
async fn test_campaign_happy_path_completes() -> Result<()> {
    let r = rollout(true).await?;
    let deployed = r.coordinator.deploy_to_vehicle("CMP-9", "VIN0001").await?;
    assert_eq!(deployed.state, DeploymentState::Notified);

    for event in lifecycle() {
        r.coordinator.handle_event("VIN0001", &event).await?;
    }

    let status = r.coordinator.deployment_status("CMP-9", "VIN0001").await?;
    assert_eq!(status.state, DeploymentState::Completed);
    assert_eq!(status.progress, 100);
    let path: Vec<DeploymentState> = status.history.iter().map(|t| t.to).collect();
    assert_eq!(
        path,
        vec![
            DeploymentState::Notified,
            DeploymentState::Accepted,
            DeploymentState::Downloading,
            DeploymentState::DownloadComplete,
            DeploymentState::Installing,
            DeploymentState::InstallComplete,
            DeploymentState::Verifying,
            DeploymentState::Completed,
        ]
    );

    let summary = r.coordinator.campaign_summary("CMP-9").await?;
    assert_eq!(summary.total_vehicles, 1);
    assert_eq!(summary.count(DeploymentState::Completed), 1);
    Ok(())
}

#[tokio::test]
async fn test_accept_sends_metadata_with_zone_endpoints() -> Result<()> {
    let r = rollout(true).await?;
    r.coordinator.deploy_to_vehicle("CMP-9", "VIN0001").await?;
    let accept = lifecycle().remove(0);
    r.coordinator.handle_event("VIN0001", &accept).await?;

    let sent = r.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[0], SentMessage::Notification { vin, .. } if vin == "VIN0001"));
    let SentMessage::Metadata { message, .. } = &sent[1] else {
        anyhow::bail!("expected metadata message, got {:?}", sent[1]);
    };

    assert!(message.download_session.session_id.starts_with("dl-"));
    let endpoints: Vec<&str> = message
        .download_session
        .endpoints
        .iter()
        .map(|e| e.download_endpoint.as_str())
        .collect();
    assert!(endpoints.contains(&"/packages/CMP-9/ZONE_FRONT.bin"));
    assert_eq!(message.rollback_data.rollback_timeout_sec, 300);
    assert!(message.rollback_data.auto_rollback_on_failure);
    assert_eq!(message.installation_sequence.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_undelivered_metadata_keeps_acceptance_and_resends() -> Result<()> {
    let r = rollout(true).await?;
    r.coordinator.deploy_to_vehicle("CMP-9", "VIN0001").await?;
    r.notifier.set_offline("VIN0001");

    let accept = lifecycle().remove(0);
    let outcome = r.coordinator.handle_event("VIN0001", &accept).await?;
    let (from, status, metadata_error) = match outcome {
        EventOutcome::Transitioned {
            from,
            status,
            metadata_error,
        } => (from, status, metadata_error),
        other => anyhow::bail!("expected a transition, got {other:?}"),
    };
    assert_eq!(from, DeploymentState::Notified);
    assert_eq!(status.state, DeploymentState::Accepted);
    assert!(metadata_error.is_some_and(|e| e.contains("unreachable")));

    let stored = r.coordinator.deployment_status("CMP-9", "VIN0001").await?;
    assert_eq!(stored.state, DeploymentState::Accepted);
    assert_eq!(r.notifier.sent().len(), 1);

    r.notifier.set_online("VIN0001");
    r.coordinator.resend_campaign_metadata("CMP-9", "VIN0001").await?;
    let sent = r.notifier.sent();
    assert!(matches!(&sent[1], SentMessage::Metadata { vin, .. } if vin == "VIN0001"));

    // Later events carry no delivery error
    let progress = lifecycle().remove(1);
    assert!(matches!(
        r.coordinator.handle_event("VIN0001", &progress).await?,
        EventOutcome::Transitioned { metadata_error: None, .. }
    ));
    Ok(())
}

#[tokio::test]
async fn test_event_for_unnotified_vehicle_leaves_no_state() -> Result<()> {
    let r = rollout(true).await?;
    let accept = lifecycle().remove(0);

    let err = r.coordinator.handle_event("VIN0404", &accept).await;
    assert!(matches!(
        err,
        Err(CampaignError::UnknownDeploymentTarget { ref vin, .. }) if vin == "VIN0404"
    ));
    assert!(r.coordinator.deployment_status("CMP-9", "VIN0404").await.is_err());

    let other = VehicleEvent::OtaCampaignResponse {
        campaign_id: "CMP-NOPE".into(),
        status: CampaignResponse::Accepted,
    };
    assert!(matches!(
        r.coordinator.handle_event("VIN0001", &other).await,
        Err(CampaignError::UnknownDeploymentTarget { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_invalid_transition_does_not_mutate() -> Result<()> {
    let r = rollout(true).await?;
    r.coordinator.deploy_to_vehicle("CMP-9", "VIN0001").await?;
    let before = r.coordinator.deployment_status("CMP-9", "VIN0001").await?;

    let skip = VehicleEvent::OtaInstallationStart {
        campaign_id: "CMP-9".into(),
    };
    let err = r.coordinator.handle_event("VIN0001", &skip).await;
    assert!(matches!(
        err,
        Err(CampaignError::InvalidTransition { ref from, ref event, .. })
            if from == "notified" && event == "ota_installation_start"
    ));

    let after = r.coordinator.deployment_status("CMP-9", "VIN0001").await?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn test_error_blocks_progress_until_rollback() -> Result<()> {
    let r = rollout(true).await?;
    r.coordinator.deploy_to_vehicle("CMP-9", "VIN0001").await?;
    let events = lifecycle();
    for event in events.iter().take(3) {
        r.coordinator.handle_event("VIN0001", event).await?;
    }

    let failure = VehicleEvent::OtaError {
        campaign_id: "CMP-9".into(),
        error: EventError {
            code: Some("FLASH_WRITE".into()),
            message: "sector 7".into(),
        },
    };
    r.coordinator.handle_event("VIN0001", &failure).await?;
    let failed = r.coordinator.deployment_status("CMP-9", "VIN0001").await?;
    assert_eq!(failed.state, DeploymentState::Failed);
    assert_eq!(failed.error.as_deref(), Some("FLASH_WRITE: sector 7"));

    for event in events.iter().skip(3) {
        assert!(matches!(
            r.coordinator.handle_event("VIN0001", event).await,
            Err(CampaignError::InvalidTransition { .. })
        ));
    }
    assert!(matches!(
        r.coordinator.handle_event("VIN0001", &failure).await,
        Err(CampaignError::InvalidTransition { .. })
    ));

    let rolled = r.coordinator.rollback("CMP-9", "VIN0001").await?;
    assert_eq!(rolled.state, DeploymentState::RolledBack);
    Ok(())
}

#[tokio::test]
async fn test_rollback_disabled_campaign() -> Result<()> {
    let r = rollout(false).await?;
    r.coordinator.deploy_to_vehicle("CMP-9", "VIN0001").await?;
    let failure = VehicleEvent::OtaError {
        campaign_id: "CMP-9".into(),
        error: EventError::default(),
    };
    r.coordinator.handle_event("VIN0001", &failure).await?;

    assert!(matches!(
        r.coordinator.rollback("CMP-9", "VIN0001").await,
        Err(CampaignError::RollbackDisabled(_))
    ));
    let rb = VehicleEvent::OtaRollbackComplete {
        campaign_id: "CMP-9".into(),
    };
    assert!(matches!(
        r.coordinator.handle_event("VIN0001", &rb).await,
        Err(CampaignError::InvalidTransition { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_notification_failure_keeps_created_and_retries() -> Result<()> {
    let r = rollout(true).await?;
    r.notifier.set_offline("VIN0002");

    assert!(matches!(
        r.coordinator.deploy_to_vehicle("CMP-9", "VIN0002").await,
        Err(CampaignError::Notification(_))
    ));
    let pending = r.coordinator.deployment_status("CMP-9", "VIN0002").await?;
    assert_eq!(pending.state, DeploymentState::Created);

    r.notifier.set_online("VIN0002");
    let deployed = r.coordinator.deploy_to_vehicle("CMP-9", "VIN0002").await?;
    assert_eq!(deployed.state, DeploymentState::Notified);

    assert!(matches!(
        r.coordinator.deploy_to_vehicle("CMP-9", "VIN0002").await,
        Err(CampaignError::InvalidTransition { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_presence_events_do_not_touch_deployments() -> Result<()> {
    let r = rollout(true).await?;
    r.coordinator.deploy_to_vehicle("CMP-9", "VIN0001").await?;
    let before = r.coordinator.deployment_status("CMP-9", "VIN0001").await?;

    let wake: VehicleEvent = serde_json::from_str(
        r#"{"msg_type":"vehicle_wake_up","event":"ignition_on","vehicle_state":{"battery":81}}"#,
    )?;
    let readiness: VehicleEvent =
        serde_json::from_str(r#"{"msg_type":"ota_readiness_response","overall_status":"ready"}"#)?;
    r.coordinator.handle_event("VIN0001", &wake).await?;
    let outcome = r.coordinator.handle_event("VIN0001", &readiness).await?;
    assert!(matches!(outcome, EventOutcome::Presence(_)));

    let presence = r.coordinator.vehicle_presence("VIN0001");
    assert_eq!(
        presence.as_ref().and_then(|p| p.readiness.as_deref()),
        Some("ready")
    );
    assert!(presence.and_then(|p| p.last_wake_up).is_some());

    let after = r.coordinator.deployment_status("CMP-9", "VIN0001").await?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_campaign_rejected() -> Result<()> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let pm = package_manager(&fleet, &dir).await?;
    let build = pm
        .create_campaign_packages("CMP-D", &fleet.targets, &EcuZoneField, true)
        .await?;

    let store = Arc::new(InMemoryCampaignStore::new());
    let coordinator = CampaignCoordinator::new(
        CampaignConfig::default(),
        store.clone(),
        store,
        Arc::new(RecordingNotifier::new()),
    );
    coordinator.create_campaign(build.metadata.clone()).await?;
    assert!(matches!(
        coordinator.create_campaign(build.metadata).await,
        Err(CampaignError::CampaignExists(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_range_reads_match_full_download() -> Result<()> {
    let fleet = fleet()?;
    let dir = TempDir::new()?;
    let pm = package_manager(&fleet, &dir).await?;
    pm.create_campaign_packages("CMP-R", &fleet.targets, &EcuZoneField, true)
        .await?;

    let downloads = DownloadService::new(pm.store().clone());
    let full = downloads.read_range("CMP-R", "ZONE_FRONT", None).await?;
    assert!(!full.partial);
    assert_eq!(full.bytes.len() as u64, full.total_size);
    assert_eq!(full.content_range_header(), None);

    let part = downloads
        .read_with_header("CMP-R", "ZONE_FRONT", Some("bytes=100-299"))
        .await?;
    assert!(part.partial);
    assert_eq!(part.bytes.as_slice(), full.bytes.get(100..300).unwrap_or_default());
    assert_eq!(
        part.content_range_header(),
        Some(format!("bytes 100-299/{}", full.total_size))
    );
    assert_eq!(part.content_hash, full.content_hash);

    let tail = downloads
        .read_with_header("CMP-R", "ZONE_FRONT", Some("bytes=-16"))
        .await?;
    assert_eq!(tail.bytes.len(), 16);
    assert_eq!(
        tail.bytes.as_slice(),
        full.bytes.get(full.bytes.len() - 16..).unwrap_or_default()
    );

    let beyond = ByteRange {
        start: full.total_size,
        end: full.total_size + 10,
    };
    assert!(matches!(
        downloads.read_range("CMP-R", "ZONE_FRONT", Some(beyond)).await,
        Err(PackageError::RangeNotSatisfiable { .. })
    ));
    assert!(matches!(
        downloads.read_range("CMP-R", "ZONE_NOWHERE", None).await,
        Err(PackageError::PackageNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_config_drives_components() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("ota.json");
    let mut config = OtaConfig::load_from_path(&path).await?;
    config.packaging.storage_dir = dir.path().join("store");
    config.packaging.compression.enabled = false;
    config.save_to_path(&path).await?;

    let config = OtaConfig::load_from_path(&path).await?;
    let fleet = fleet()?;
    let store = PackageStore::open(&config.packaging.storage_dir).await?;
    let pm = PackageManager::new(config.packaging.clone(), fleet.firmware.clone(), store);
    assert!(!pm.compressor().is_compressing());

    let report = pm.build_zonal_packages("CMP-C", &fleet.targets, &EcuZoneField).await;
    let rear = report.built().find(|m| m.zone_id == "ZONE_REAR");
    let bytes = match rear {
        Some(m) => tokio::fs::read(&m.file_reference).await?,
        None => anyhow::bail!("ZONE_REAR was not built"),
    };
    let check = verify_zonal_package(&bytes, pm.compressor())?;
    assert_eq!(check.members.first().map(|m| m.payload_size), Some(1024));
    Ok(())
}
