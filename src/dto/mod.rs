//! Request and response DTOs
//!
//! Request bodies derive `validator::Validate`; services call `validate()`
//! before touching the store.

use serde::{Deserialize, Serialize};

use crate::models::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub mod alert_dto;
pub mod maintenance_dto;
pub mod mileage_dto;
pub mod vehicle_dto;

/// Standard success envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}

/// Query of `GET /api/activity`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u32>,
}

impl ActivityQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}
