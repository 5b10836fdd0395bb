//! Mileage recording service
//!
//! Orchestrates one reading end to end:
//!
//! 1. resolve the vehicle and check the caller may write to it
//! 2. take the per-vehicle lock
//! 3. reject a repeat of the latest reading inside the debounce window
//! 4. reject anything not strictly above the current odometer
//! 5. evaluate thresholds against a settings snapshot
//! 6. commit ledger entry, vehicle update and optional alert atomically
//! 7. emit activity (best effort)
//!
//! Steps 3 to 6 are retried as a unit when the commit finds the vehicle
//! changed underneath it or the store reports a transient failure.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::models::activity::{ActivityEvent, ActivityKind};
use crate::models::alert::{Alert, AlertKind, NewAlert};
use crate::models::auth::Actor;
use crate::models::mileage::{HistoryQuery, MileageEntry, MileageRecord, NewMileageRecord};
use crate::models::pagination::{Page, PageRequest};
use crate::models::settings::{FleetSettings, ThresholdConfig};
use crate::models::vehicle::{Vehicle, VehicleRef};
use crate::repositories::{FleetStore, ReadingCommit};
use crate::services::activity_service::ActivityService;
use crate::services::authorization_service::AuthorizationService;
use crate::services::settings_service::SettingsProvider;
use crate::services::threshold_evaluator::{evaluate, Evaluation, EvaluationInput};
use crate::services::vehicle_locks::VehicleLocks;
use crate::services::vehicle_service::resolve_vehicle;
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Result of an accepted reading
#[derive(Debug, Clone, Serialize)]
pub struct RecordedMileage {
    pub record: MileageRecord,
    pub vehicle: Vehicle,
    pub alert: Option<Alert>,
    /// Miles left in the current cycle after this reading
    pub remaining: i64,
}

/// Human-readable alert text
pub fn alert_message(kind: AlertKind, vehicle: &Vehicle, mileage: i64, remaining: i64, config: &ThresholdConfig) -> String {
    match kind {
        AlertKind::LimitExceeded => format!(
            "Vehicle {} has exceeded its mileage limit of {} miles. Current mileage: {} miles.",
            vehicle.label(),
            config.mileage_limit,
            mileage
        ),
        AlertKind::NearLimit => format!(
            "Vehicle {} is approaching its mileage limit. Current: {} miles, Limit: {} miles. Only {} miles remaining.",
            vehicle.label(),
            mileage,
            config.mileage_limit,
            remaining
        ),
    }
}

#[derive(Clone)]
pub struct MileageService {
    store: Arc<dyn FleetStore>,
    settings: Arc<dyn SettingsProvider>,
    activity: ActivityService,
    locks: VehicleLocks,
    authz: AuthorizationService,
    max_attempts: u32,
}

impl MileageService {
    pub fn new(
        store: Arc<dyn FleetStore>,
        settings: Arc<dyn SettingsProvider>,
        activity: ActivityService,
        locks: VehicleLocks,
    ) -> Self {
        Self {
            store,
            settings,
            activity,
            locks,
            authz: AuthorizationService::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Record a new odometer reading
    #[tracing::instrument(skip(self, actor, notes), fields(vehicle = %reference, user = %actor.user_id))]
    pub async fn record(
        &self,
        reference: &VehicleRef,
        new_mileage: i64,
        actor: &Actor,
        notes: Option<String>,
    ) -> AppResult<RecordedMileage> {
        let result = self.record_inner(reference, new_mileage, actor, notes).await;
        metrics::record_outcome(&result);
        result
    }

    async fn record_inner(
        &self,
        reference: &VehicleRef,
        new_mileage: i64,
        actor: &Actor,
        notes: Option<String>,
    ) -> AppResult<RecordedMileage> {
        let vehicle = resolve_vehicle(self.store.as_ref(), reference).await?;
        self.authz.ensure_vehicle_access(actor, vehicle.id, "record mileage")?;

        let _guard = self.locks.acquire(vehicle.id).await;

        let mut attempt = 1;
        let recorded = loop {
            match self.try_record(&vehicle, new_mileage, actor, notes.clone()).await {
                Ok(recorded) => break recorded,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!("🔁 Retrying mileage commit for {} (attempt {}): {}", vehicle.label(), attempt, e);
                    metrics::RECORDING_RETRIES_TOTAL.inc();
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            "📍 {} mileage {} -> {} ({})",
            recorded.vehicle.label(),
            vehicle.current_mileage,
            recorded.record.recorded_mileage,
            recorded.vehicle.status
        );

        self.activity
            .record(
                ActivityEvent::new(
                    ActivityKind::Mileage,
                    format!(
                        "Mileage for {} updated to {} miles",
                        recorded.vehicle.label(),
                        recorded.record.recorded_mileage
                    ),
                )
                .for_vehicle(recorded.vehicle.id)
                .by_user(actor.user_id),
            )
            .await;

        if let Some(alert) = &recorded.alert {
            self.announce_alert(alert).await;
        }

        Ok(recorded)
    }

    /// One attempt at steps 3 to 6, always against freshly loaded state
    async fn try_record(
        &self,
        resolved: &Vehicle,
        new_mileage: i64,
        actor: &Actor,
        notes: Option<String>,
    ) -> AppResult<RecordedMileage> {
        let settings = self.settings.current().await;
        let vehicle = self.load_live(resolved.id).await?;
        let latest = self.store.latest_for_vehicle(vehicle.id).await?;
        let vehicle = self.reconcile(vehicle, latest.as_ref(), &settings).await?;

        if let Some(latest) = &latest {
            let window = Duration::seconds(settings.duplicate_window_secs);
            if latest.recorded_mileage == new_mileage && Utc::now() - latest.recorded_at <= window {
                return Err(AppError::DuplicateSubmission {
                    mileage: new_mileage,
                    recorded_at: latest.recorded_at,
                });
            }
        }

        if new_mileage <= vehicle.current_mileage {
            return Err(AppError::InvalidMileage {
                current: vehicle.current_mileage,
                submitted: new_mileage,
            });
        }

        let config = settings.thresholds_for(&vehicle);
        let evaluation = evaluate(&EvaluationInput::for_reading(&vehicle, new_mileage), &config);
        debug!(
            "Evaluated {}: status {}, remaining {}, alert {:?}",
            vehicle.label(),
            evaluation.status,
            evaluation.remaining,
            evaluation.alert
        );

        let committed = self
            .store
            .commit_reading(ReadingCommit {
                vehicle_id: vehicle.id,
                expected_mileage: vehicle.current_mileage,
                record: Some(NewMileageRecord {
                    vehicle_id: vehicle.id,
                    recorded_mileage: new_mileage,
                    recorded_at: Utc::now(),
                    recorded_by: actor.user_id,
                    notes,
                }),
                update: evaluation.mileage_update(new_mileage),
                alert: pending_alert(&vehicle, new_mileage, &evaluation, &config),
            })
            .await?;

        let record = committed
            .record
            .ok_or_else(|| AppError::Internal("Commit returned no ledger record".to_string()))?;

        Ok(RecordedMileage {
            record,
            vehicle: committed.vehicle,
            alert: committed.alert,
            remaining: evaluation.remaining,
        })
    }

    /// Newest-first history with derived deltas
    pub async fn history(
        &self,
        reference: &VehicleRef,
        query: &HistoryQuery,
        page: PageRequest,
        actor: &Actor,
    ) -> AppResult<Page<MileageEntry>> {
        let vehicle = resolve_vehicle(self.store.as_ref(), reference).await?;
        self.authz.ensure_vehicle_access(actor, vehicle.id, "view mileage history")?;

        self.store.list_for_vehicle(vehicle.id, query, page).await
    }

    /// Vehicle with status re-derived from the ledger if the ledger is ahead
    /// of the registry row (readings appended outside this service).
    pub async fn current_vehicle(&self, reference: &VehicleRef, actor: &Actor) -> AppResult<Vehicle> {
        let vehicle = resolve_vehicle(self.store.as_ref(), reference).await?;
        self.authz.ensure_vehicle_access(actor, vehicle.id, "view vehicle")?;

        let latest = self.store.latest_for_vehicle(vehicle.id).await?;
        if !is_behind(&vehicle, latest.as_ref()) {
            return Ok(vehicle);
        }

        let _guard = self.locks.acquire(vehicle.id).await;
        let settings = self.settings.current().await;
        let vehicle = self.load_live(vehicle.id).await?;
        let latest = self.store.latest_for_vehicle(vehicle.id).await?;

        match self.reconcile(vehicle.clone(), latest.as_ref(), &settings).await {
            Ok(reconciled) => Ok(reconciled),
            Err(AppError::StaleVehicle(id)) => self.load_live(id).await,
            Err(e) => Err(e),
        }
    }

    async fn load_live(&self, id: uuid::Uuid) -> AppResult<Vehicle> {
        self.store
            .get_vehicle(id)
            .await?
            .filter(|v| !v.is_deleted())
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }

    /// Bring the registry row up to the latest ledger reading, firing any
    /// alert that reading should have fired.
    async fn reconcile(
        &self,
        vehicle: Vehicle,
        latest: Option<&MileageRecord>,
        settings: &FleetSettings,
    ) -> AppResult<Vehicle> {
        let latest = match latest {
            Some(latest) if is_behind(&vehicle, Some(latest)) => latest,
            _ => return Ok(vehicle),
        };

        warn!(
            "🩹 Reconciling {}: registry at {}, ledger at {}",
            vehicle.label(),
            vehicle.current_mileage,
            latest.recorded_mileage
        );

        let config = settings.thresholds_for(&vehicle);
        let evaluation = evaluate(&EvaluationInput::for_reading(&vehicle, latest.recorded_mileage), &config);

        let committed = self
            .store
            .commit_reading(ReadingCommit {
                vehicle_id: vehicle.id,
                expected_mileage: vehicle.current_mileage,
                record: None,
                update: evaluation.mileage_update(latest.recorded_mileage),
                alert: pending_alert(&vehicle, latest.recorded_mileage, &evaluation, &config),
            })
            .await?;

        if let Some(alert) = &committed.alert {
            self.announce_alert(alert).await;
        }

        Ok(committed.vehicle)
    }

    async fn announce_alert(&self, alert: &Alert) {
        metrics::record_alert(alert.kind);
        warn!("🚨 {} alert: {}", alert.kind, alert.message);
        self.activity
            .record(ActivityEvent::new(ActivityKind::Alert, alert.message.clone()).for_vehicle(alert.vehicle_id))
            .await;
    }
}

fn is_behind(vehicle: &Vehicle, latest: Option<&MileageRecord>) -> bool {
    latest.map_or(false, |r| r.recorded_mileage > vehicle.current_mileage)
}

fn pending_alert(vehicle: &Vehicle, mileage: i64, evaluation: &Evaluation, config: &ThresholdConfig) -> Option<NewAlert> {
    evaluation.alert.map(|kind| NewAlert {
        kind,
        message: alert_message(kind, vehicle, mileage, evaluation.remaining, config),
        cycle: evaluation.cycle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::vehicle::NewVehicle;

    #[test]
    fn test_alert_messages() {
        let vehicle = NewVehicle {
            registration_number: "AB 123".to_string(),
            fleet_number: Some("VH-001".to_string()),
            vehicle_type: None,
            assigned_driver_id: None,
            mileage_limit: 5000,
            warning_margin: None,
            initial_mileage: 0,
        }
        .into_vehicle(Utc::now());
        let config = ThresholdConfig::new(5000, 200);

        assert_eq!(
            alert_message(AlertKind::LimitExceeded, &vehicle, 5100, -100, &config),
            "Vehicle VH-001 has exceeded its mileage limit of 5000 miles. Current mileage: 5100 miles."
        );
        assert_eq!(
            alert_message(AlertKind::NearLimit, &vehicle, 4850, 150, &config),
            "Vehicle VH-001 is approaching its mileage limit. Current: 4850 miles, Limit: 5000 miles. Only 150 miles remaining."
        );
    }
}
