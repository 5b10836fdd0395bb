//! Alert model
//!
//! Alerts are append-only. Acknowledging flips a flag (`OPEN -> ACKNOWLEDGED`,
//! terminal); nothing is ever deleted here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Closed set of alert kinds - maps `alert_kind`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "alert_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    NearLimit,
    LimitExceeded,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::NearLimit => "NEAR_LIMIT",
            AlertKind::LimitExceeded => "LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub seq: i64,
    pub vehicle_id: Uuid,
    pub kind: AlertKind,
    pub message: String,
    /// Threshold cycle the alert belongs to
    pub cycle: i64,
    pub triggered_at: DateTime<Utc>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Alert to append alongside an accepted reading
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub kind: AlertKind,
    pub message: String,
    pub cycle: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub vehicle_id: Option<Uuid>,
    pub acknowledged: Option<bool>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        self.vehicle_id.map_or(true, |id| alert.vehicle_id == id)
            && self.acknowledged.map_or(true, |ack| alert.acknowledged == ack)
    }
}
