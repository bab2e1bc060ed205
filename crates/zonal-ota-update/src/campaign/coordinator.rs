//! Campaign coordinator
//!
//! Owns the per-vehicle deployment state machine. Every change goes through
//! the allow-list in [`next_state`] and is written with a conditional update,
//! so rejected events and lost races leave the stored record untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;
use zonal_ota_errors::CampaignError;

use super::repository::{
    CampaignMetadataMessage, CampaignNotification, CampaignRepository, DeploymentRepository,
    DownloadSession, RollbackData, VehicleNotifier, ZoneEndpoint,
};
use super::state::{DeploymentState, DeploymentStatus, VehicleEvent, next_state};
use crate::config::CampaignConfig;
use crate::metadata::CampaignMetadata;

/// Latest non-campaign information reported by a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehiclePresence {
    pub vin: String,
    pub last_seen: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_wake_up: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_state: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vci: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness: Option<String>,
}

impl VehiclePresence {
    fn new(vin: &str, now: DateTime<Utc>) -> Self {
        Self {
            vin: vin.to_string(),
            last_seen: now,
            last_wake_up: None,
            vehicle_state: None,
            vci: None,
            readiness: None,
        }
    }
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// Presence information was recorded; no deployment changed.
    Presence(VehiclePresence),
    /// A deployment moved from one state to another.
    Transitioned {
        from: DeploymentState,
        status: DeploymentStatus,
        /// Set when the move to `Accepted` was stored but the campaign
        /// metadata could not be delivered; retry with
        /// [`CampaignCoordinator::resend_campaign_metadata`].
        metadata_error: Option<String>,
    },
}

/// Count of vehicles per state for one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignSummary {
    pub campaign_id: String,
    pub total_vehicles: usize,
    pub by_state: BTreeMap<DeploymentState, usize>,
}

impl CampaignSummary {
    pub fn count(&self, state: DeploymentState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Drives campaign rollouts across vehicles.
pub struct CampaignCoordinator {
    config: CampaignConfig,
    campaigns: Arc<dyn CampaignRepository>,
    deployments: Arc<dyn DeploymentRepository>,
    notifier: Arc<dyn VehicleNotifier>,
    presence: RwLock<HashMap<String, VehiclePresence>>,
}

impl CampaignCoordinator {
    pub fn new(
        config: CampaignConfig,
        campaigns: Arc<dyn CampaignRepository>,
        deployments: Arc<dyn DeploymentRepository>,
        notifier: Arc<dyn VehicleNotifier>,
    ) -> Self {
        Self {
            config,
            campaigns,
            deployments,
            notifier,
            presence: RwLock::new(HashMap::new()),
        }
    }

    /// Register a built campaign.
    pub async fn create_campaign(&self, metadata: CampaignMetadata) -> Result<(), CampaignError> {
        let campaign_id = metadata.campaign_id.clone();
        let zones = metadata.packages.len();
        if !self.campaigns.insert_if_absent(metadata).await? {
            return Err(CampaignError::CampaignExists(campaign_id));
        }
        info!(campaign_id = %campaign_id, zones, "Campaign created");
        Ok(())
    }

    async fn campaign(&self, campaign_id: &str) -> Result<CampaignMetadata, CampaignError> {
        self.campaigns
            .get(campaign_id)
            .await?
            .ok_or_else(|| CampaignError::UnknownCampaign(campaign_id.to_string()))
    }

    /// Offer `campaign_id` to `vin` and move its record to `Notified`.
    ///
    /// The record is created in `Created` first. If the notification cannot be
    /// sent it stays there and the call may be repeated.
    pub async fn deploy_to_vehicle(
        &self,
        campaign_id: &str,
        vin: &str,
    ) -> Result<DeploymentStatus, CampaignError> {
        let campaign = self.campaign(campaign_id).await?;

        let record = match self.deployments.get(campaign_id, vin).await? {
            Some(existing) if existing.state == DeploymentState::Created => existing,
            Some(existing) => {
                warn!(campaign_id, vin, state = %existing.state, "Vehicle already deployed");
                return Err(CampaignError::invalid_transition(
                    campaign_id,
                    vin,
                    existing.state.as_str(),
                    "deploy",
                ));
            }
            None => {
                let fresh = DeploymentStatus::new(campaign_id, vin);
                if !self.deployments.insert_if_absent(fresh.clone()).await? {
                    return Err(CampaignError::ConcurrentModification {
                        campaign_id: campaign_id.to_string(),
                        vin: vin.to_string(),
                    });
                }
                fresh
            }
        };

        let notification = CampaignNotification {
            msg_type: "ota_campaign",
            campaign_id: campaign_id.to_string(),
            campaign_type: "software_update",
            vin: vin.to_string(),
            target_ecus: campaign.target_ecus.iter().map(|e| e.to_string()).collect(),
            total_size_bytes: campaign.total_size(),
            rollback_enabled: campaign.rollback_enabled,
        };
        if let Err(e) = self.notifier.send_campaign_notification(vin, &notification).await {
            error!(campaign_id, vin, error = %e, "Campaign notification failed");
            return Err(e);
        }

        self.commit(record, DeploymentState::Notified, "deploy", None)
            .await
    }

    /// Apply an inbound vehicle event.
    ///
    /// An `Err` means no deployment was changed.
    pub async fn handle_event(
        &self,
        vin: &str,
        event: &VehicleEvent,
    ) -> Result<EventOutcome, CampaignError> {
        let Some(campaign_id) = event.campaign_id() else {
            return Ok(EventOutcome::Presence(self.record_presence(vin, event)));
        };

        let campaign = match self.campaigns.get(campaign_id).await? {
            Some(c) => c,
            None => {
                warn!(campaign_id, vin, event = event.name(), "Event for unknown campaign");
                return Err(CampaignError::unknown_target(campaign_id, vin));
            }
        };
        let current = match self.deployments.get(campaign_id, vin).await? {
            Some(s) if s.state != DeploymentState::Created => s,
            _ => {
                warn!(campaign_id, vin, event = event.name(), "Event for vehicle never notified");
                return Err(CampaignError::unknown_target(campaign_id, vin));
            }
        };

        let from = current.state;
        let Some(to) = next_state(from, event, campaign.rollback_enabled) else {
            warn!(campaign_id, vin, state = %from, event = event.name(), "Rejected event");
            return Err(CampaignError::invalid_transition(
                campaign_id,
                vin,
                from.as_str(),
                event.name(),
            ));
        };

        let status = self.commit(current, to, event.name(), Some(event)).await?;

        let metadata_error = if to == DeploymentState::Accepted {
            self.send_campaign_metadata(&campaign, vin)
                .await
                .err()
                .map(|e| e.to_string())
        } else {
            None
        };

        Ok(EventOutcome::Transitioned {
            from,
            status,
            metadata_error,
        })
    }

    /// Persist `current` advanced to `to`, failing if it changed since it was read.
    async fn commit(
        &self,
        current: DeploymentStatus,
        to: DeploymentState,
        event_name: &str,
        event: Option<&VehicleEvent>,
    ) -> Result<DeploymentStatus, CampaignError> {
        let mut next = current.advanced(to, event_name, Utc::now());
        if let Some(p) = event.and_then(VehicleEvent::progress) {
            next.progress = p;
        }
        if to == DeploymentState::Failed {
            next.error = event.and_then(VehicleEvent::failure_reason);
        }

        let applied = self
            .deployments
            .update_if(current.state, current.revision, next.clone())
            .await?;
        if !applied {
            warn!(
                campaign_id = %current.campaign_id,
                vin = %current.vin,
                "Deployment changed concurrently"
            );
            return Err(CampaignError::ConcurrentModification {
                campaign_id: current.campaign_id,
                vin: current.vin,
            });
        }

        info!(
            campaign_id = %next.campaign_id,
            vin = %next.vin,
            from = %current.state,
            to = %next.state,
            event = event_name,
            "Deployment transition"
        );
        Ok(next)
    }

    /// Build the metadata message an accepting vehicle receives.
    pub fn metadata_message(&self, campaign: &CampaignMetadata) -> CampaignMetadataMessage {
        let endpoints = campaign
            .packages
            .iter()
            .map(|p| ZoneEndpoint {
                zone_id: p.zone_id.clone(),
                download_endpoint: format!("/packages/{}/{}.bin", campaign.campaign_id, p.zone_id),
                package_size: p.package_size,
                sha256: p.content_hash.clone(),
            })
            .collect();

        CampaignMetadataMessage {
            msg_type: "ota_campaign_metadata",
            campaign_id: campaign.campaign_id.clone(),
            download_session: DownloadSession {
                session_id: format!("dl-{}", Uuid::new_v4()),
                method: "https",
                server_url: self.config.download_base_url.clone(),
                token_expiry_sec: self.config.download_token_ttl_secs,
                resume_supported: true,
                partial_download_supported: true,
                endpoints,
            },
            packages: campaign.packages.clone(),
            installation_sequence: campaign.installation_sequence.clone(),
            rollback_data: RollbackData {
                rollback_enabled: campaign.rollback_enabled,
                rollback_timeout_sec: self.config.rollback_timeout_secs,
                auto_rollback_on_failure: campaign.rollback_enabled,
            },
        }
    }

    async fn send_campaign_metadata(
        &self,
        campaign: &CampaignMetadata,
        vin: &str,
    ) -> Result<(), CampaignError> {
        let message = self.metadata_message(campaign);
        self.notifier
            .send_campaign_metadata(vin, &message)
            .await
            .inspect_err(|e| {
                error!(
                    campaign_id = %campaign.campaign_id,
                    vin,
                    error = %e,
                    "Campaign metadata delivery failed"
                );
            })
    }

    /// Send the metadata message again to a vehicle that accepted.
    pub async fn resend_campaign_metadata(
        &self,
        campaign_id: &str,
        vin: &str,
    ) -> Result<(), CampaignError> {
        let campaign = self.campaign(campaign_id).await?;
        match self.deployments.get(campaign_id, vin).await? {
            Some(s) if s.state == DeploymentState::Accepted => {
                self.send_campaign_metadata(&campaign, vin).await
            }
            Some(s) => Err(CampaignError::invalid_transition(
                campaign_id,
                vin,
                s.state.as_str(),
                "resend_metadata",
            )),
            None => Err(CampaignError::unknown_target(campaign_id, vin)),
        }
    }

    /// Move a failed deployment to `RolledBack`.
    pub async fn rollback(
        &self,
        campaign_id: &str,
        vin: &str,
    ) -> Result<DeploymentStatus, CampaignError> {
        let campaign = self.campaign(campaign_id).await?;
        if !campaign.rollback_enabled {
            return Err(CampaignError::RollbackDisabled(campaign_id.to_string()));
        }
        let event = VehicleEvent::OtaRollbackComplete {
            campaign_id: campaign_id.to_string(),
        };
        match self.handle_event(vin, &event).await? {
            EventOutcome::Transitioned { status, .. } => Ok(status),
            EventOutcome::Presence(_) => Err(CampaignError::unknown_target(campaign_id, vin)),
        }
    }

    pub async fn deployment_status(
        &self,
        campaign_id: &str,
        vin: &str,
    ) -> Result<DeploymentStatus, CampaignError> {
        self.deployments
            .get(campaign_id, vin)
            .await?
            .ok_or_else(|| CampaignError::unknown_target(campaign_id, vin))
    }

    pub async fn campaign_summary(&self, campaign_id: &str) -> Result<CampaignSummary, CampaignError> {
        self.campaign(campaign_id).await?;
        let records = self.deployments.list_campaign(campaign_id).await?;

        let mut by_state = BTreeMap::new();
        for r in &records {
            *by_state.entry(r.state).or_insert(0) += 1;
        }
        Ok(CampaignSummary {
            campaign_id: campaign_id.to_string(),
            total_vehicles: records.len(),
            by_state,
        })
    }

    pub fn vehicle_presence(&self, vin: &str) -> Option<VehiclePresence> {
        self.presence.read().get(vin).cloned()
    }

    fn record_presence(&self, vin: &str, event: &VehicleEvent) -> VehiclePresence {
        let now = Utc::now();
        let mut presence = self.presence.write();
        let entry = presence
            .entry(vin.to_string())
            .or_insert_with(|| VehiclePresence::new(vin, now));
        entry.last_seen = now;

        match event {
            VehicleEvent::VehicleWakeUp { vehicle_state, .. } => {
                entry.last_wake_up = Some(now);
                if !vehicle_state.is_null() {
                    entry.vehicle_state = Some(vehicle_state.clone());
                }
            }
            VehicleEvent::VciReport { inventory } => entry.vci = Some(inventory.clone()),
            VehicleEvent::OtaReadinessResponse { overall_status } => {
                entry.readiness = Some(overall_status.clone());
            }
            _ => {}
        }
        info!(vin, event = event.name(), "Vehicle presence updated");
        entry.clone()
    }
}
