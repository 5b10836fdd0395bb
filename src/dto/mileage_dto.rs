use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::models::mileage::HistoryQuery;
use crate::models::pagination::PageRequest;

/// Body of `POST /api/mileage`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordMileageRequest {
    /// Vehicle UUID, fleet number or registration number
    #[validate(length(min = 1))]
    pub vehicle_id: String,
    #[validate(range(min = 0))]
    pub mileage: i64,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Query of `GET /api/mileage/:vehicle/history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl HistoryParams {
    pub fn query(&self) -> HistoryQuery {
        HistoryQuery {
            from: self.from,
            to: self.to,
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}
