use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Category of an audit event - maps `activity_kind`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "activity_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Vehicle,
    Mileage,
    Alert,
    Maintenance,
    Settings,
}

/// Fire-and-forget audit event
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ActivityEvent {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub message: String,
    pub vehicle_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            vehicle_id: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_vehicle(mut self, vehicle_id: Uuid) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }

    pub fn by_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}
