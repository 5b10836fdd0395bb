//! Maintenance records
//!
//! A service visit with `reset_mileage` moves the service baseline to the
//! current odometer. Under the service-baseline cycle mode that opens a new
//! threshold cycle and re-arms both alerts; under odometer-modulo the status
//! is re-derived and the cycle's alert flags are kept. It runs under the same
//! per-vehicle lock as mileage recording.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::dto::maintenance_dto::CreateMaintenanceRequest;
use crate::models::activity::{ActivityEvent, ActivityKind};
use crate::models::auth::Actor;
use crate::models::maintenance::MaintenanceRecord;
use crate::models::pagination::{Page, PageRequest};
use crate::models::vehicle::VehicleRef;
use crate::repositories::{CommittedService, FleetStore, ServiceCommit};
use crate::services::activity_service::ActivityService;
use crate::services::authorization_service::AuthorizationService;
use crate::services::settings_service::SettingsProvider;
use crate::services::threshold_evaluator::service_reset;
use crate::services::vehicle_locks::VehicleLocks;
use crate::services::vehicle_service::resolve_vehicle;
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct MaintenanceService {
    store: Arc<dyn FleetStore>,
    settings: Arc<dyn SettingsProvider>,
    activity: ActivityService,
    locks: VehicleLocks,
    authz: AuthorizationService,
    max_attempts: u32,
}

impl MaintenanceService {
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
            max_attempts: crate::services::mileage_service::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn record_service(&self, request: CreateMaintenanceRequest, actor: &Actor) -> AppResult<CommittedService> {
        request.validate()?;

        let reference = VehicleRef::parse(&request.vehicle_id);
        let vehicle = resolve_vehicle(self.store.as_ref(), &reference).await?;
        self.authz.ensure_vehicle_access(actor, vehicle.id, "record maintenance")?;

        let input = request.into_new_maintenance();
        let settings = self.settings.current().await;
        let _guard = self.locks.acquire(vehicle.id).await;

        let mut attempt = 1;
        let committed = loop {
            let current = resolve_vehicle(self.store.as_ref(), &VehicleRef::Id(vehicle.id)).await?;
            let record = input.clone().into_record(current.id, current.current_mileage, actor.user_id);
            let reset = record
                .reset_mileage
                .then(|| service_reset(&current, &settings.thresholds_for(&current)));

            let result = self
                .store
                .commit_service(ServiceCommit {
                    vehicle_id: current.id,
                    expected_mileage: current.current_mileage,
                    reset,
                    record,
                })
                .await;

            match result {
                Ok(committed) => break committed,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!("🔁 Retrying maintenance commit for {}: {}", current.label(), e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let label = committed.vehicle.label().to_string();
        let message = if committed.record.reset_mileage {
            format!(
                "Maintenance recorded for {} at {} miles; service cycle {} started",
                label, committed.record.mileage_at_service, committed.vehicle.service_cycle
            )
        } else {
            format!("Maintenance recorded for {} at {} miles", label, committed.record.mileage_at_service)
        };
        info!("🔧 {}", message);

        self.activity
            .record(
                ActivityEvent::new(ActivityKind::Maintenance, message)
                    .for_vehicle(committed.vehicle.id)
                    .by_user(actor.user_id),
            )
            .await;

        Ok(committed)
    }

    /// Newest service first; drivers are pinned to their vehicle
    pub async fn list(
        &self,
        vehicle: Option<&VehicleRef>,
        page: PageRequest,
        actor: &Actor,
    ) -> AppResult<Page<MaintenanceRecord>> {
        let requested = match vehicle {
            Some(reference) => Some(resolve_vehicle(self.store.as_ref(), reference).await?.id),
            None => None,
        };
        let vehicle_id = self.authz.vehicle_scope(actor, requested, "list maintenance")?;

        self.store.list_maintenance(vehicle_id, page).await
    }
}
