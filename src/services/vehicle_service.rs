//! Vehicle registry operations
//!
//! External identifiers (UUID, fleet number, registration) are resolved to
//! the surrogate id here; everything below this layer works on `Uuid`.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::dto::vehicle_dto::CreateVehicleRequest;
use crate::models::activity::{ActivityEvent, ActivityKind};
use crate::models::auth::Actor;
use crate::models::mileage::NewMileageRecord;
use crate::models::vehicle::{NewVehicle, Vehicle, VehicleRef};
use crate::repositories::FleetStore;
use crate::services::activity_service::ActivityService;
use crate::services::authorization_service::AuthorizationService;
use crate::services::settings_service::SettingsProvider;
use crate::services::threshold_evaluator::{classify, cycle_position, EvaluationInput};
use crate::utils::errors::{not_found_error, AppResult};

/// Resolve any external identifier to a live vehicle
pub async fn resolve_vehicle(store: &dyn FleetStore, reference: &VehicleRef) -> AppResult<Vehicle> {
    let vehicle = match reference {
        VehicleRef::Id(id) => store.get_vehicle(*id).await?,
        VehicleRef::Code(code) => store.find_vehicle_by_code(code).await?,
    };

    vehicle
        .filter(|v| !v.is_deleted())
        .ok_or_else(|| not_found_error("Vehicle", &reference.to_string()))
}

#[derive(Clone)]
pub struct VehicleService {
    store: Arc<dyn FleetStore>,
    settings: Arc<dyn SettingsProvider>,
    activity: ActivityService,
    authz: AuthorizationService,
}

impl VehicleService {
    pub fn new(store: Arc<dyn FleetStore>, settings: Arc<dyn SettingsProvider>, activity: ActivityService) -> Self {
        Self {
            store,
            settings,
            activity,
            authz: AuthorizationService::new(),
        }
    }

    pub async fn resolve(&self, reference: &VehicleRef) -> AppResult<Vehicle> {
        resolve_vehicle(self.store.as_ref(), reference).await
    }

    /// Register a vehicle. A non-zero starting odometer is written to the
    /// ledger as the first reading; its status is derived but no alert fires.
    pub async fn create(&self, request: CreateVehicleRequest, actor: &Actor) -> AppResult<Vehicle> {
        self.authz.require_fleet_manager(actor, "create vehicle")?;
        request.validate()?;

        let settings = self.settings.current().await;
        let initial_mileage = request.initial_mileage.unwrap_or(0);

        let mut vehicle = NewVehicle {
            registration_number: request.registration_number.trim().to_string(),
            fleet_number: request.fleet_number.map(|f| f.trim().to_string()),
            vehicle_type: request.vehicle_type,
            assigned_driver_id: request.assigned_driver_id,
            mileage_limit: request.mileage_limit.unwrap_or(settings.default_mileage_limit),
            warning_margin: request.warning_margin,
            initial_mileage,
        }
        .into_vehicle(Utc::now());

        let config = settings.thresholds_for(&vehicle);
        let (_, remaining) = cycle_position(
            initial_mileage,
            &EvaluationInput::for_reading(&vehicle, initial_mileage),
            &config,
        );
        vehicle.status = classify(remaining, config.warning_margin);

        let initial = (initial_mileage > 0).then(|| NewMileageRecord {
            vehicle_id: vehicle.id,
            recorded_mileage: initial_mileage,
            recorded_at: vehicle.created_at,
            recorded_by: actor.user_id,
            notes: Some("Initial odometer reading".to_string()),
        });
        let vehicle = self.store.commit_registration(&vehicle, initial).await?;

        info!("🚚 Vehicle {} registered ({} mile limit)", vehicle.label(), vehicle.mileage_limit);
        self.activity
            .record(
                ActivityEvent::new(ActivityKind::Vehicle, format!("Vehicle {} registered", vehicle.label()))
                    .for_vehicle(vehicle.id)
                    .by_user(actor.user_id),
            )
            .await;

        Ok(vehicle)
    }

    /// Drivers only see their assigned vehicle
    pub async fn list(&self, actor: &Actor, include_deleted: bool) -> AppResult<Vec<Vehicle>> {
        let include_deleted = include_deleted && actor.is_fleet_manager();
        let vehicles = self.store.list_vehicles(include_deleted).await?;

        Ok(vehicles
            .into_iter()
            .filter(|v| self.authz.can_access_vehicle(actor, v.id))
            .collect())
    }

    pub async fn get(&self, reference: &VehicleRef, actor: &Actor) -> AppResult<Vehicle> {
        let vehicle = self.resolve(reference).await?;
        self.authz.ensure_vehicle_access(actor, vehicle.id, "view vehicle")?;
        Ok(vehicle)
    }

    pub async fn delete(&self, reference: &VehicleRef, actor: &Actor) -> AppResult<Vehicle> {
        self.authz.require_fleet_manager(actor, "delete vehicle")?;

        let id = match reference {
            VehicleRef::Id(id) => *id,
            VehicleRef::Code(_) => self.resolve(reference).await?.id,
        };
        let vehicle = self.store.soft_delete_vehicle(id, Utc::now()).await?;

        info!("🗑️ Vehicle {} deleted", vehicle.label());
        self.activity
            .record(
                ActivityEvent::new(ActivityKind::Vehicle, format!("Vehicle {} deleted", vehicle.label()))
                    .for_vehicle(vehicle.id)
                    .by_user(actor.user_id),
            )
            .await;

        Ok(vehicle)
    }
}
