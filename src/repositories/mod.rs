//! Repositories module
//!
//! Storage seams for the fleet core. Each component gets its own trait; a
//! backend implements all of them plus [`FleetStore`], which adds the
//! multi-row writes that must be atomic.
//!
//! Two backends exist: [`PgFleetStore`] (PostgreSQL via sqlx) and
//! [`MemoryFleetStore`] (tokio `RwLock`, used by tests and
//! `STORAGE_BACKEND=memory`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::activity::ActivityEvent;
use crate::models::alert::{Alert, AlertFilter, NewAlert};
use crate::models::maintenance::MaintenanceRecord;
use crate::models::mileage::{HistoryQuery, MileageEntry, MileageRecord, NewMileageRecord};
use crate::models::pagination::{Page, PageRequest};
use crate::models::vehicle::{MileageUpdate, ServiceReset, Vehicle};
use crate::utils::errors::AppResult;

pub mod activity_repository;
pub mod alert_repository;
pub mod maintenance_repository;
pub mod memory_store;
pub mod mileage_repository;
pub mod postgres_store;
pub mod vehicle_repository;

pub use memory_store::MemoryFleetStore;
pub use postgres_store::PgFleetStore;

/// Vehicle identity and derived mileage state
#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    /// Fails with `Conflict` when the registration or fleet number is taken
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle>;

    /// Includes soft-deleted rows
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    /// Live vehicle by fleet number, falling back to registration number
    async fn find_vehicle_by_code(&self, code: &str) -> AppResult<Option<Vehicle>>;

    async fn list_vehicles(&self, include_deleted: bool) -> AppResult<Vec<Vehicle>>;

    /// `NotFound` for unknown ids, `Conflict` if already deleted
    async fn soft_delete_vehicle(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Vehicle>;
}

/// Append-only odometer readings
#[async_trait]
pub trait MileageLedger: Send + Sync {
    /// Never applies business rules; `NotFound` only for an unknown vehicle
    async fn append(&self, record: NewMileageRecord) -> AppResult<MileageRecord>;

    /// Chronologically last reading (by `recorded_at`, then `seq`)
    async fn latest_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<MileageRecord>>;

    /// Newest first, deltas derived within the date-filtered scope
    async fn list_for_vehicle(
        &self,
        vehicle_id: Uuid,
        query: &HistoryQuery,
        page: PageRequest,
    ) -> AppResult<Page<MileageEntry>>;
}

/// Fired alerts; the store itself never deduplicates
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn fire(&self, vehicle_id: Uuid, alert: NewAlert) -> AppResult<Alert>;

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>>;

    /// `NotFound` if absent; no-op when already acknowledged
    async fn acknowledge(&self, id: Uuid) -> AppResult<Alert>;

    /// Newest first
    async fn list_alerts(&self, filter: &AlertFilter, page: PageRequest) -> AppResult<Page<Alert>>;

    /// Acknowledge every open alert in one transaction, returning how many changed
    async fn acknowledge_all(&self) -> AppResult<u64>;
}

#[async_trait]
pub trait MaintenanceLog: Send + Sync {
    /// Newest service date first
    async fn list_maintenance(
        &self,
        vehicle_id: Option<Uuid>,
        page: PageRequest,
    ) -> AppResult<Page<MaintenanceRecord>>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn log_activity(&self, event: &ActivityEvent) -> AppResult<()>;

    async fn recent_activity(&self, limit: u32) -> AppResult<Vec<ActivityEvent>>;
}

/// Everything an accepted reading writes, applied all-or-nothing.
///
/// `expected_mileage` is the odometer value the caller evaluated against; the
/// commit fails with `StaleVehicle` if the row moved since.
#[derive(Debug, Clone)]
pub struct ReadingCommit {
    pub vehicle_id: Uuid,
    pub expected_mileage: i64,
    /// `None` when only re-deriving state from readings already in the ledger
    pub record: Option<NewMileageRecord>,
    pub update: MileageUpdate,
    pub alert: Option<NewAlert>,
}

#[derive(Debug, Clone)]
pub struct CommittedReading {
    pub record: Option<MileageRecord>,
    pub vehicle: Vehicle,
    pub alert: Option<Alert>,
}

/// A maintenance visit, optionally opening a new threshold cycle
#[derive(Debug, Clone)]
pub struct ServiceCommit {
    pub vehicle_id: Uuid,
    pub expected_mileage: i64,
    pub record: MaintenanceRecord,
    /// Derived by the caller under the active cycle mode
    pub reset: Option<ServiceReset>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommittedService {
    pub record: MaintenanceRecord,
    pub vehicle: Vehicle,
}

/// Full storage surface used by the services
#[async_trait]
pub trait FleetStore: VehicleRegistry + MileageLedger + AlertStore + MaintenanceLog + ActivityLog {
    /// Insert a vehicle together with its opening ledger reading, all-or-nothing
    async fn commit_registration(&self, vehicle: &Vehicle, initial: Option<NewMileageRecord>) -> AppResult<Vehicle>;

    async fn commit_reading(&self, commit: ReadingCommit) -> AppResult<CommittedReading>;

    async fn commit_service(&self, commit: ServiceCommit) -> AppResult<CommittedService>;

    /// Backend liveness for `/health`
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Write a derived maintenance reset onto a vehicle row
pub(crate) fn apply_service_reset(vehicle: &mut Vehicle, reset: &ServiceReset, now: DateTime<Utc>) {
    vehicle.last_service_mileage = reset.service_mileage;
    vehicle.service_cycle = reset.service_cycle;
    vehicle.status = reset.status;
    vehicle.warning_fired = reset.warning_fired;
    vehicle.critical_fired = reset.critical_fired;
    vehicle.updated_at = now;
}
