//! PostgreSQL fleet store
//!
//! Plain reads and writes delegate to the per-table repositories. The two
//! commits open a transaction, row-lock the vehicle (`FOR UPDATE`) and verify
//! the odometer the caller evaluated against before writing anything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::activity_repository::ActivityRepository;
use super::alert_repository::AlertRepository;
use super::maintenance_repository::MaintenanceRepository;
use super::mileage_repository::MileageRepository;
use super::vehicle_repository::VehicleRepository;
use super::{
    apply_service_reset, ActivityLog, AlertStore, CommittedReading, CommittedService, FleetStore,
    MaintenanceLog, MileageLedger, ReadingCommit, ServiceCommit, VehicleRegistry,
};
use crate::models::activity::ActivityEvent;
use crate::models::alert::{Alert, AlertFilter, NewAlert};
use crate::models::maintenance::MaintenanceRecord;
use crate::models::mileage::{HistoryQuery, MileageEntry, MileageRecord, NewMileageRecord};
use crate::models::pagination::{Page, PageRequest};
use crate::models::vehicle::Vehicle;
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct PgFleetStore {
    pool: PgPool,
    vehicles: VehicleRepository,
    mileage: MileageRepository,
    alerts: AlertRepository,
    maintenance: MaintenanceRepository,
    activity: ActivityRepository,
}

impl PgFleetStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            vehicles: VehicleRepository::new(pool.clone()),
            mileage: MileageRepository::new(pool.clone()),
            alerts: AlertRepository::new(pool.clone()),
            maintenance: MaintenanceRepository::new(pool.clone()),
            activity: ActivityRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl VehicleRegistry for PgFleetStore {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        self.vehicles.create(vehicle).await
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        self.vehicles.find_by_id(id).await
    }

    async fn find_vehicle_by_code(&self, code: &str) -> AppResult<Option<Vehicle>> {
        self.vehicles.find_by_code(code).await
    }

    async fn list_vehicles(&self, include_deleted: bool) -> AppResult<Vec<Vehicle>> {
        self.vehicles.list(include_deleted).await
    }

    async fn soft_delete_vehicle(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Vehicle> {
        self.vehicles.soft_delete(id, at).await
    }
}

#[async_trait]
impl MileageLedger for PgFleetStore {
    async fn append(&self, record: NewMileageRecord) -> AppResult<MileageRecord> {
        self.mileage.append(&record).await
    }

    async fn latest_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<MileageRecord>> {
        self.mileage.latest_for_vehicle(vehicle_id).await
    }

    async fn list_for_vehicle(
        &self,
        vehicle_id: Uuid,
        query: &HistoryQuery,
        page: PageRequest,
    ) -> AppResult<Page<MileageEntry>> {
        self.mileage.list_for_vehicle(vehicle_id, query, page).await
    }
}

#[async_trait]
impl AlertStore for PgFleetStore {
    async fn fire(&self, vehicle_id: Uuid, alert: NewAlert) -> AppResult<Alert> {
        self.alerts.fire(vehicle_id, &alert).await
    }

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>> {
        self.alerts.find_by_id(id).await
    }

    async fn acknowledge(&self, id: Uuid) -> AppResult<Alert> {
        self.alerts.acknowledge(id).await
    }

    async fn list_alerts(&self, filter: &AlertFilter, page: PageRequest) -> AppResult<Page<Alert>> {
        self.alerts.list(filter, page).await
    }

    async fn acknowledge_all(&self) -> AppResult<u64> {
        self.alerts.acknowledge_all().await
    }
}

#[async_trait]
impl MaintenanceLog for PgFleetStore {
    async fn list_maintenance(
        &self,
        vehicle_id: Option<Uuid>,
        page: PageRequest,
    ) -> AppResult<Page<MaintenanceRecord>> {
        self.maintenance.list(vehicle_id, page).await
    }
}

#[async_trait]
impl ActivityLog for PgFleetStore {
    async fn log_activity(&self, event: &ActivityEvent) -> AppResult<()> {
        self.activity.insert(event).await
    }

    async fn recent_activity(&self, limit: u32) -> AppResult<Vec<ActivityEvent>> {
        self.activity.recent(limit).await
    }
}

#[async_trait]
impl FleetStore for PgFleetStore {
    async fn commit_registration(&self, vehicle: &Vehicle, initial: Option<NewMileageRecord>) -> AppResult<Vehicle> {
        let mut tx = self.pool.begin().await?;

        let created = VehicleRepository::insert(&mut tx, vehicle).await?;
        if let Some(record) = &initial {
            MileageRepository::insert(&mut tx, record).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn commit_reading(&self, commit: ReadingCommit) -> AppResult<CommittedReading> {
        let mut tx = self.pool.begin().await?;

        let locked = VehicleRepository::lock_for_update(&mut tx, commit.vehicle_id).await?;
        if locked.current_mileage != commit.expected_mileage {
            debug!(
                "Vehicle {} moved from {} to {} before commit",
                commit.vehicle_id, commit.expected_mileage, locked.current_mileage
            );
            return Err(AppError::StaleVehicle(commit.vehicle_id));
        }

        let record = match &commit.record {
            Some(new) => Some(MileageRepository::insert(&mut tx, new).await?),
            None => None,
        };
        let vehicle = VehicleRepository::apply_mileage_update(&mut tx, commit.vehicle_id, &commit.update).await?;
        let alert = match &commit.alert {
            Some(new) => Some(AlertRepository::insert(&mut tx, commit.vehicle_id, new).await?),
            None => None,
        };

        tx.commit().await?;

        Ok(CommittedReading { record, vehicle, alert })
    }

    async fn commit_service(&self, commit: ServiceCommit) -> AppResult<CommittedService> {
        let mut tx = self.pool.begin().await?;

        let mut vehicle = VehicleRepository::lock_for_update(&mut tx, commit.vehicle_id).await?;
        if vehicle.current_mileage != commit.expected_mileage {
            return Err(AppError::StaleVehicle(commit.vehicle_id));
        }

        let record = MaintenanceRepository::insert(&mut tx, &commit.record).await?;
        if let Some(reset) = &commit.reset {
            apply_service_reset(&mut vehicle, reset, Utc::now());
            vehicle = VehicleRepository::save_service_state(&mut tx, &vehicle).await?;
        }

        tx.commit().await?;

        Ok(CommittedService { record, vehicle })
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
