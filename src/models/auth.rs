//! Caller identity
//!
//! Authentication itself lives outside this service; we only verify the
//! bearer token and read `{user_id, role, assigned_vehicle_id}` from it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// System roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Manager,
    Driver,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Manager => "MANAGER",
            UserRole::Driver => "DRIVER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Some(UserRole::Admin),
            "MANAGER" => Some(UserRole::Manager),
            "DRIVER" => Some(UserRole::Driver),
            _ => None,
        }
    }
}

/// Authenticated caller injected into every `/api` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
    /// Only drivers carry one
    pub assigned_vehicle_id: Option<Uuid>,
}

impl Actor {
    pub fn is_fleet_manager(&self) -> bool {
        matches!(self.role, UserRole::Admin | UserRole::Manager)
    }
}

/// JWT claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_vehicle_id: Option<String>,
    pub exp: usize,
    pub iat: usize,
}
