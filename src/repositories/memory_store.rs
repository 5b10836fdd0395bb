//! In-memory fleet store
//!
//! One `RwLock` guards the whole state, so every `commit_*` call is trivially
//! atomic. Used by the test suite and by `STORAGE_BACKEND=memory`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    apply_service_reset, ActivityLog, AlertStore, CommittedReading, CommittedService, FleetStore,
    MaintenanceLog, MileageLedger, ReadingCommit, ServiceCommit, VehicleRegistry,
};
use crate::models::activity::ActivityEvent;
use crate::models::alert::{Alert, AlertFilter, NewAlert};
use crate::models::maintenance::MaintenanceRecord;
use crate::models::mileage::{derive_deltas, HistoryQuery, MileageEntry, MileageRecord, NewMileageRecord};
use crate::models::pagination::{Page, PageRequest};
use crate::models::vehicle::Vehicle;
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Debug, Default)]
struct MemoryState {
    seq: i64,
    vehicles: HashMap<Uuid, Vehicle>,
    ledger: Vec<MileageRecord>,
    alerts: Vec<Alert>,
    maintenance: Vec<MaintenanceRecord>,
    activity: Vec<ActivityEvent>,
}

impl MemoryState {
    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn ensure_unique(&self, vehicle: &Vehicle) -> AppResult<()> {
        for existing in self.vehicles.values() {
            if existing.registration_number == vehicle.registration_number {
                return Err(conflict_error("Vehicle", "registration number", &vehicle.registration_number));
            }
            if let (Some(a), Some(b)) = (&existing.fleet_number, &vehicle.fleet_number) {
                if a == b {
                    return Err(conflict_error("Vehicle", "fleet number", b));
                }
            }
        }
        Ok(())
    }

    fn live_vehicle_mut(&mut self, id: Uuid) -> AppResult<&mut Vehicle> {
        match self.vehicles.get_mut(&id) {
            Some(vehicle) if !vehicle.is_deleted() => Ok(vehicle),
            _ => Err(not_found_error("Vehicle", &id.to_string())),
        }
    }

    fn push_record(&mut self, new: NewMileageRecord) -> MileageRecord {
        let record = MileageRecord {
            id: Uuid::new_v4(),
            seq: self.next_seq(),
            vehicle_id: new.vehicle_id,
            recorded_mileage: new.recorded_mileage,
            recorded_at: new.recorded_at,
            recorded_by: new.recorded_by,
            notes: new.notes,
        };
        self.ledger.push(record.clone());
        record
    }

    fn push_alert(&mut self, vehicle_id: Uuid, new: NewAlert) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            seq: self.next_seq(),
            vehicle_id,
            kind: new.kind,
            message: new.message,
            cycle: new.cycle,
            triggered_at: Utc::now(),
            acknowledged: false,
            acknowledged_at: None,
        };
        self.alerts.push(alert.clone());
        alert
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFleetStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleRegistry for MemoryFleetStore {
    async fn insert_vehicle(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let mut state = self.state.write().await;
        state.ensure_unique(vehicle)?;

        state.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle.clone())
    }

    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.state.read().await.vehicles.get(&id).cloned())
    }

    async fn find_vehicle_by_code(&self, code: &str) -> AppResult<Option<Vehicle>> {
        let state = self.state.read().await;
        let vehicles = &state.vehicles;
        let live = || vehicles.values().filter(|v| !v.is_deleted());

        let found = live()
            .find(|v| v.fleet_number.as_deref() == Some(code))
            .or_else(|| live().find(|v| v.registration_number == code));
        Ok(found.cloned())
    }

    async fn list_vehicles(&self, include_deleted: bool) -> AppResult<Vec<Vehicle>> {
        let state = self.state.read().await;
        let mut vehicles: Vec<Vehicle> = state
            .vehicles
            .values()
            .filter(|v| include_deleted || !v.is_deleted())
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(vehicles)
    }

    async fn soft_delete_vehicle(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Vehicle> {
        let mut state = self.state.write().await;
        let vehicle = state
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))?;

        if vehicle.is_deleted() {
            return Err(AppError::Conflict(format!("Vehicle '{}' is already deleted", vehicle.label())));
        }

        vehicle.deleted_at = Some(at);
        vehicle.updated_at = at;
        Ok(vehicle.clone())
    }
}

#[async_trait]
impl MileageLedger for MemoryFleetStore {
    async fn append(&self, record: NewMileageRecord) -> AppResult<MileageRecord> {
        let mut state = self.state.write().await;
        if !state.vehicles.contains_key(&record.vehicle_id) {
            return Err(not_found_error("Vehicle", &record.vehicle_id.to_string()));
        }
        Ok(state.push_record(record))
    }

    async fn latest_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<MileageRecord>> {
        let state = self.state.read().await;
        let latest = state
            .ledger
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id)
            .max_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.seq.cmp(&b.seq)));
        Ok(latest.cloned())
    }

    async fn list_for_vehicle(
        &self,
        vehicle_id: Uuid,
        query: &HistoryQuery,
        page: PageRequest,
    ) -> AppResult<Page<MileageEntry>> {
        let in_scope: Vec<MileageRecord> = {
            let state = self.state.read().await;
            state
                .ledger
                .iter()
                .filter(|r| r.vehicle_id == vehicle_id && query.contains(r.recorded_at))
                .cloned()
                .collect()
        };

        let mut entries = derive_deltas(in_scope);
        entries.reverse();
        Ok(page.apply(entries))
    }
}

#[async_trait]
impl AlertStore for MemoryFleetStore {
    async fn fire(&self, vehicle_id: Uuid, alert: NewAlert) -> AppResult<Alert> {
        let mut state = self.state.write().await;
        if !state.vehicles.contains_key(&vehicle_id) {
            return Err(not_found_error("Vehicle", &vehicle_id.to_string()));
        }
        Ok(state.push_alert(vehicle_id, alert))
    }

    async fn get_alert(&self, id: Uuid) -> AppResult<Option<Alert>> {
        let state = self.state.read().await;
        Ok(state.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn acknowledge(&self, id: Uuid) -> AppResult<Alert> {
        let mut state = self.state.write().await;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found_error("Alert", &id.to_string()))?;

        if !alert.acknowledged {
            alert.acknowledged = true;
            alert.acknowledged_at = Some(Utc::now());
        }
        Ok(alert.clone())
    }

    async fn list_alerts(&self, filter: &AlertFilter, page: PageRequest) -> AppResult<Page<Alert>> {
        let state = self.state.read().await;
        let mut alerts: Vec<Alert> = state.alerts.iter().filter(|a| filter.matches(a)).cloned().collect();
        alerts.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at).then(b.seq.cmp(&a.seq)));
        Ok(page.apply(alerts))
    }

    async fn acknowledge_all(&self) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let mut count = 0;
        for alert in state.alerts.iter_mut().filter(|a| !a.acknowledged) {
            alert.acknowledged = true;
            alert.acknowledged_at = Some(now);
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl MaintenanceLog for MemoryFleetStore {
    async fn list_maintenance(
        &self,
        vehicle_id: Option<Uuid>,
        page: PageRequest,
    ) -> AppResult<Page<MaintenanceRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<MaintenanceRecord> = state
            .maintenance
            .iter()
            .filter(|m| vehicle_id.map_or(true, |id| m.vehicle_id == id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.service_date.cmp(&a.service_date).then(b.created_at.cmp(&a.created_at)));
        Ok(page.apply(records))
    }
}

#[async_trait]
impl ActivityLog for MemoryFleetStore {
    async fn log_activity(&self, event: &ActivityEvent) -> AppResult<()> {
        self.state.write().await.activity.push(event.clone());
        Ok(())
    }

    async fn recent_activity(&self, limit: u32) -> AppResult<Vec<ActivityEvent>> {
        let state = self.state.read().await;
        Ok(state.activity.iter().rev().take(limit as usize).cloned().collect())
    }
}

#[async_trait]
impl FleetStore for MemoryFleetStore {
    async fn commit_registration(&self, vehicle: &Vehicle, initial: Option<NewMileageRecord>) -> AppResult<Vehicle> {
        let mut state = self.state.write().await;
        state.ensure_unique(vehicle)?;

        state.vehicles.insert(vehicle.id, vehicle.clone());
        if let Some(record) = initial {
            state.push_record(record);
        }
        Ok(vehicle.clone())
    }

    async fn commit_reading(&self, commit: ReadingCommit) -> AppResult<CommittedReading> {
        let mut state = self.state.write().await;

        let vehicle = state.live_vehicle_mut(commit.vehicle_id)?;
        if vehicle.current_mileage != commit.expected_mileage {
            return Err(AppError::StaleVehicle(commit.vehicle_id));
        }

        let update = commit.update;
        vehicle.current_mileage = update.current_mileage;
        vehicle.status = update.status;
        vehicle.warning_fired = update.warning_fired;
        vehicle.critical_fired = update.critical_fired;
        vehicle.updated_at = Utc::now();
        let vehicle = vehicle.clone();

        let record = commit.record.map(|new| state.push_record(new));
        let alert = commit.alert.map(|new| state.push_alert(commit.vehicle_id, new));

        Ok(CommittedReading { record, vehicle, alert })
    }

    async fn commit_service(&self, commit: ServiceCommit) -> AppResult<CommittedService> {
        let mut state = self.state.write().await;

        let vehicle = state.live_vehicle_mut(commit.vehicle_id)?;
        if vehicle.current_mileage != commit.expected_mileage {
            return Err(AppError::StaleVehicle(commit.vehicle_id));
        }
        if let Some(reset) = &commit.reset {
            apply_service_reset(vehicle, reset, Utc::now());
        }
        let vehicle = vehicle.clone();

        state.maintenance.push(commit.record.clone());
        Ok(CommittedService {
            record: commit.record,
            vehicle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alert::AlertKind;
    use crate::models::vehicle::{MileageUpdate, NewVehicle, VehicleStatus};
    use chrono::Duration;

    fn new_vehicle(registration: &str, fleet: Option<&str>) -> Vehicle {
        NewVehicle {
            registration_number: registration.to_string(),
            fleet_number: fleet.map(str::to_string),
            vehicle_type: None,
            assigned_driver_id: None,
            mileage_limit: 5000,
            warning_margin: None,
            initial_mileage: 0,
        }
        .into_vehicle(Utc::now())
    }

    fn reading(vehicle_id: Uuid, mileage: i64, at: DateTime<Utc>) -> NewMileageRecord {
        NewMileageRecord {
            vehicle_id,
            recorded_mileage: mileage,
            recorded_at: at,
            recorded_by: Uuid::nil(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let store = MemoryFleetStore::new();
        store.insert_vehicle(&new_vehicle("AB-123", Some("VH-1"))).await.unwrap();

        let err = store.insert_vehicle(&new_vehicle("AB-123", None)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = store.insert_vehicle(&new_vehicle("CD-456", Some("VH-1"))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_registration_writes_vehicle_and_reading_together() {
        let store = MemoryFleetStore::new();
        let mut vehicle = new_vehicle("AB-123", Some("VH-1"));
        vehicle.current_mileage = 1200;

        let created = store
            .commit_registration(&vehicle, Some(reading(vehicle.id, 1200, vehicle.created_at)))
            .await
            .unwrap();
        assert_eq!(created.current_mileage, 1200);
        let latest = store.latest_for_vehicle(vehicle.id).await.unwrap().unwrap();
        assert_eq!(latest.recorded_mileage, 1200);

        let clash = new_vehicle("CD-456", Some("VH-1"));
        let err = store
            .commit_registration(&clash, Some(reading(clash.id, 900, Utc::now())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.get_vehicle(clash.id).await.unwrap().is_none());
        assert!(store.latest_for_vehicle(clash.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_code_skips_deleted() {
        let store = MemoryFleetStore::new();
        let vehicle = store.insert_vehicle(&new_vehicle("AB-123", Some("VH-1"))).await.unwrap();

        assert!(store.find_vehicle_by_code("VH-1").await.unwrap().is_some());
        assert!(store.find_vehicle_by_code("AB-123").await.unwrap().is_some());

        store.soft_delete_vehicle(vehicle.id, Utc::now()).await.unwrap();
        assert!(store.find_vehicle_by_code("VH-1").await.unwrap().is_none());

        let err = store.soft_delete_vehicle(vehicle.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_with_deltas() {
        let store = MemoryFleetStore::new();
        let vehicle = store.insert_vehicle(&new_vehicle("AB-123", None)).await.unwrap();
        let t1 = Utc::now();
        let t2 = t1 + Duration::hours(1);
        let t3 = t2 + Duration::hours(1);

        store.append(reading(vehicle.id, 700, t3)).await.unwrap();
        store.append(reading(vehicle.id, 100, t1)).await.unwrap();
        store.append(reading(vehicle.id, 300, t2)).await.unwrap();

        let page = store
            .list_for_vehicle(vehicle.id, &HistoryQuery::default(), PageRequest::first())
            .await
            .unwrap();
        let added: Vec<i64> = page.items.iter().map(|e| e.miles_added).collect();
        assert_eq!(added, vec![400, 200, 100]);
        assert_eq!(page.total, 3);

        let latest = store.latest_for_vehicle(vehicle.id).await.unwrap().unwrap();
        assert_eq!(latest.recorded_mileage, 700);
    }

    #[tokio::test]
    async fn test_commit_rejects_stale_expectation() {
        let store = MemoryFleetStore::new();
        let vehicle = store.insert_vehicle(&new_vehicle("AB-123", None)).await.unwrap();

        let commit = ReadingCommit {
            vehicle_id: vehicle.id,
            expected_mileage: 50,
            record: Some(reading(vehicle.id, 100, Utc::now())),
            update: MileageUpdate {
                current_mileage: 100,
                status: VehicleStatus::Active,
                warning_fired: false,
                critical_fired: false,
            },
            alert: None,
        };
        let err = store.commit_reading(commit).await.unwrap_err();
        assert!(matches!(err, AppError::StaleVehicle(_)));

        // nothing was written
        assert!(store.latest_for_vehicle(vehicle.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_acknowledge_is_idempotent() {
        let store = MemoryFleetStore::new();
        let vehicle = store.insert_vehicle(&new_vehicle("AB-123", None)).await.unwrap();
        let alert = store
            .fire(
                vehicle.id,
                NewAlert {
                    kind: AlertKind::NearLimit,
                    message: "near".to_string(),
                    cycle: 0,
                },
            )
            .await
            .unwrap();

        let first = store.acknowledge(alert.id).await.unwrap();
        let second = store.acknowledge(alert.id).await.unwrap();
        assert!(second.acknowledged);
        assert_eq!(first.acknowledged_at, second.acknowledged_at);

        assert_eq!(store.acknowledge_all().await.unwrap(), 0);
        assert!(matches!(
            store.acknowledge(Uuid::new_v4()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
