//! Vehicle model
//!
//! Maps the `vehicles` table. `current_mileage`, `status` and the fired flags
//! are owned by the mileage recording path; nothing else writes them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Vehicle status, derived from mileage against the cap - maps `vehicle_status`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "vehicle_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Active,
    NearLimit,
    LimitExceeded,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Active => "ACTIVE",
            VehicleStatus::NearLimit => "NEAR_LIMIT",
            VehicleStatus::LimitExceeded => "LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub registration_number: String,
    pub fleet_number: Option<String>,
    pub vehicle_type: Option<String>,
    pub assigned_driver_id: Option<Uuid>,
    pub mileage_limit: i64,
    /// Overrides the fleet-wide warning margin when set
    pub warning_margin: Option<i64>,
    pub current_mileage: i64,
    pub last_service_mileage: i64,
    pub service_cycle: i64,
    pub status: VehicleStatus,
    pub warning_fired: bool,
    pub critical_fired: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    /// Human-facing identifier used in alert and activity messages
    pub fn label(&self) -> &str {
        self.fleet_number.as_deref().unwrap_or(&self.registration_number)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Miles driven since the last maintenance reset
    pub fn cycle_mileage(&self) -> i64 {
        (self.current_mileage - self.last_service_mileage).max(0)
    }
}

/// Data required to register a vehicle
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub registration_number: String,
    pub fleet_number: Option<String>,
    pub vehicle_type: Option<String>,
    pub assigned_driver_id: Option<Uuid>,
    pub mileage_limit: i64,
    pub warning_margin: Option<i64>,
    pub initial_mileage: i64,
}

impl NewVehicle {
    /// Build the row for a fresh registration
    pub fn into_vehicle(self, now: DateTime<Utc>) -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            registration_number: self.registration_number,
            fleet_number: self.fleet_number,
            vehicle_type: self.vehicle_type,
            assigned_driver_id: self.assigned_driver_id,
            mileage_limit: self.mileage_limit,
            warning_margin: self.warning_margin,
            current_mileage: self.initial_mileage,
            last_service_mileage: 0,
            service_cycle: 0,
            status: VehicleStatus::Active,
            warning_fired: false,
            critical_fired: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// External vehicle identifier, normalized once at the service boundary.
///
/// Callers may pass the surrogate UUID or a human code (fleet number or
/// registration number); the core only ever sees the UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VehicleRef {
    Id(Uuid),
    Code(String),
}

impl VehicleRef {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => VehicleRef::Id(id),
            Err(_) => VehicleRef::Code(raw.to_string()),
        }
    }
}

impl fmt::Display for VehicleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleRef::Id(id) => write!(f, "{}", id),
            VehicleRef::Code(code) => f.write_str(code),
        }
    }
}

/// Fields written by an accepted reading, applied inside the atomic commit
#[derive(Debug, Clone, PartialEq)]
pub struct MileageUpdate {
    pub current_mileage: i64,
    pub status: VehicleStatus,
    pub warning_fired: bool,
    pub critical_fired: bool,
}

/// Registry fields written by a maintenance reset; the odometer is untouched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceReset {
    pub service_mileage: i64,
    pub service_cycle: i64,
    pub status: VehicleStatus,
    pub warning_fired: bool,
    pub critical_fired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_ref_parsing() {
        let id = Uuid::new_v4();
        assert_eq!(VehicleRef::parse(&id.to_string()), VehicleRef::Id(id));
        assert_eq!(VehicleRef::parse(" VH-001 "), VehicleRef::Code("VH-001".to_string()));
    }

    #[test]
    fn test_label_prefers_fleet_number() {
        let mut vehicle = NewVehicle {
            registration_number: "ABC 1234".to_string(),
            fleet_number: None,
            vehicle_type: None,
            assigned_driver_id: None,
            mileage_limit: 5000,
            warning_margin: None,
            initial_mileage: 0,
        }
        .into_vehicle(Utc::now());
        assert_eq!(vehicle.label(), "ABC 1234");

        vehicle.fleet_number = Some("VH-001".to_string());
        assert_eq!(vehicle.label(), "VH-001");
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&VehicleStatus::LimitExceeded).unwrap();
        assert_eq!(json, "\"LIMIT_EXCEEDED\"");
    }
}
