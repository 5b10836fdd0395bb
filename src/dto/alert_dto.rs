use serde::{Deserialize, Serialize};

use crate::models::pagination::PageRequest;

/// Query of `GET /api/alerts`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertListParams {
    /// Vehicle UUID, fleet number or registration number
    pub vehicle_id: Option<String>,
    pub acknowledged: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AlertListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AcknowledgeAllResponse {
    pub success: bool,
    pub acknowledged: u64,
}
