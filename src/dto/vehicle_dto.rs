use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::validate_vehicle_code;

/// Body of `POST /api/vehicles`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVehicleRequest {
    #[validate(length(min = 2, max = 32), custom = "validate_vehicle_code")]
    pub registration_number: String,
    #[validate(length(min = 2, max = 32), custom = "validate_vehicle_code")]
    pub fleet_number: Option<String>,
    #[validate(length(max = 64))]
    pub vehicle_type: Option<String>,
    pub assigned_driver_id: Option<Uuid>,
    /// Falls back to the fleet default when absent
    #[validate(range(min = 1))]
    pub mileage_limit: Option<i64>,
    #[validate(range(min = 0))]
    pub warning_margin: Option<i64>,
    #[validate(range(min = 0))]
    pub initial_mileage: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct VehicleListQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateVehicleRequest {
        CreateVehicleRequest {
            registration_number: "AB 123 CD".to_string(),
            fleet_number: Some("VH-001".to_string()),
            vehicle_type: Some("Van".to_string()),
            assigned_driver_id: None,
            mileage_limit: Some(5000),
            warning_margin: None,
            initial_mileage: None,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_rejects_short_registration_and_zero_limit() {
        let mut invalid = request();
        invalid.registration_number = "A".to_string();
        invalid.mileage_limit = Some(0);

        let errors = invalid.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("registration_number"));
        assert!(fields.contains_key("mileage_limit"));
    }
}
