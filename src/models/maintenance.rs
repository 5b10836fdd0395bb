//! Maintenance records
//!
//! A service visit may reset the vehicle's threshold cycle. The odometer is
//! never rewound; the reset moves the service baseline instead.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub description: String,
    pub artisan_name: Option<String>,
    pub company_name: Option<String>,
    pub contact_number: Option<String>,
    pub cost: Option<Decimal>,
    pub notes: Option<String>,
    pub mileage_at_service: i64,
    pub reset_mileage: bool,
    pub service_date: DateTime<Utc>,
    pub submitted_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Service visit as submitted by a caller
#[derive(Debug, Clone)]
pub struct NewMaintenance {
    pub description: String,
    pub artisan_name: Option<String>,
    pub company_name: Option<String>,
    pub contact_number: Option<String>,
    pub cost: Option<Decimal>,
    pub notes: Option<String>,
    pub reset_mileage: bool,
    pub service_date: DateTime<Utc>,
}

impl NewMaintenance {
    pub fn into_record(self, vehicle_id: Uuid, mileage_at_service: i64, submitted_by: Uuid) -> MaintenanceRecord {
        MaintenanceRecord {
            id: Uuid::new_v4(),
            vehicle_id,
            description: self.description,
            artisan_name: self.artisan_name,
            company_name: self.company_name,
            contact_number: self.contact_number,
            cost: self.cost,
            notes: self.notes,
            mileage_at_service,
            reset_mileage: self.reset_mileage,
            service_date: self.service_date,
            submitted_by,
            created_at: Utc::now(),
        }
    }
}
