use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::models::maintenance::NewMaintenance;
use crate::models::pagination::PageRequest;
use crate::utils::validation::{validate_non_negative, validate_not_empty, validate_phone};

fn validate_cost(cost: &Decimal) -> Result<(), ValidationError> {
    validate_non_negative(*cost)
}

/// Body of `POST /api/maintenance`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMaintenanceRequest {
    #[validate(length(min = 1))]
    pub vehicle_id: String,
    #[validate(length(min = 1, max = 500), custom = "validate_not_empty")]
    pub description: String,
    pub artisan_name: Option<String>,
    pub company_name: Option<String>,
    #[validate(custom = "validate_phone")]
    pub contact_number: Option<String>,
    #[validate(custom = "validate_cost")]
    pub cost: Option<Decimal>,
    pub notes: Option<String>,
    /// Start a new threshold cycle at the current odometer
    #[serde(default)]
    pub reset_mileage: bool,
    /// Defaults to now
    pub service_date: Option<DateTime<Utc>>,
}

impl CreateMaintenanceRequest {
    pub fn into_new_maintenance(self) -> NewMaintenance {
        NewMaintenance {
            description: self.description,
            artisan_name: self.artisan_name,
            company_name: self.company_name,
            contact_number: self.contact_number,
            cost: self.cost,
            notes: self.notes,
            reset_mileage: self.reset_mileage,
            service_date: self.service_date.unwrap_or_else(Utc::now),
        }
    }
}

/// Query of `GET /api/maintenance`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceListParams {
    pub vehicle_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl MaintenanceListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}
