use uuid::Uuid;

use crate::models::auth::{Actor, UserRole};
use crate::utils::errors::{forbidden_error, AppResult};

/// Servicio de autorización: roles y alcance por vehículo
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationService;

impl AuthorizationService {
    pub fn new() -> Self {
        Self
    }

    /// Verifica si el actor tiene alguno de los roles dados
    pub fn has_any_role(&self, actor: &Actor, roles: &[UserRole]) -> bool {
        roles.contains(&actor.role)
    }

    /// Verifica si el actor puede operar sobre un vehículo específico
    pub fn can_access_vehicle(&self, actor: &Actor, vehicle_id: Uuid) -> bool {
        match actor.role {
            UserRole::Admin | UserRole::Manager => true,
            UserRole::Driver => actor.assigned_vehicle_id == Some(vehicle_id),
        }
    }

    pub fn ensure_vehicle_access(&self, actor: &Actor, vehicle_id: Uuid, operation: &str) -> AppResult<()> {
        if self.can_access_vehicle(actor, vehicle_id) {
            Ok(())
        } else {
            Err(forbidden_error(operation, "vehicle is not assigned to you"))
        }
    }

    /// Solo admin o manager
    pub fn require_fleet_manager(&self, actor: &Actor, operation: &str) -> AppResult<()> {
        if actor.is_fleet_manager() {
            Ok(())
        } else {
            Err(forbidden_error(operation, "requires an admin or manager role"))
        }
    }

    pub fn require_admin(&self, actor: &Actor, operation: &str) -> AppResult<()> {
        if actor.role == UserRole::Admin {
            Ok(())
        } else {
            Err(forbidden_error(operation, "requires the admin role"))
        }
    }

    /// Filtro de vehículo para un listado.
    ///
    /// Los managers conservan lo que pidieron. Los conductores quedan fijados
    /// a su vehículo asignado y no pueden pedir otro.
    pub fn vehicle_scope(&self, actor: &Actor, requested: Option<Uuid>, operation: &str) -> AppResult<Option<Uuid>> {
        if actor.is_fleet_manager() {
            return Ok(requested);
        }

        let assigned = actor
            .assigned_vehicle_id
            .ok_or_else(|| forbidden_error(operation, "no vehicle is assigned to you"))?;

        match requested {
            Some(id) if id != assigned => Err(forbidden_error(operation, "vehicle is not assigned to you")),
            _ => Ok(Some(assigned)),
        }
    }

    pub fn access_level(&self, actor: &Actor) -> AccessLevel {
        match actor.role {
            UserRole::Admin | UserRole::Manager => AccessLevel::Fleet,
            UserRole::Driver => AccessLevel::Vehicle,
        }
    }
}

/// Qué parte de la flota puede ver el llamante
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Todos los vehículos
    Fleet,
    /// Solo el vehículo asignado
    Vehicle,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Fleet => "fleet",
            AccessLevel::Vehicle => "vehicle",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::AppError;

    fn actor(role: UserRole, assigned: Option<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
            assigned_vehicle_id: assigned,
        }
    }

    #[test]
    fn test_driver_limited_to_assigned_vehicle() {
        let authz = AuthorizationService::new();
        let own = Uuid::new_v4();
        let driver = actor(UserRole::Driver, Some(own));

        assert!(authz.can_access_vehicle(&driver, own));
        assert!(!authz.can_access_vehicle(&driver, Uuid::new_v4()));
        assert!(authz.can_access_vehicle(&actor(UserRole::Manager, None), own));
        assert_eq!(authz.access_level(&driver), AccessLevel::Vehicle);
    }

    #[test]
    fn test_role_requirements() {
        let authz = AuthorizationService::new();
        let manager = actor(UserRole::Manager, None);

        assert!(authz.require_fleet_manager(&manager, "delete vehicle").is_ok());
        assert!(matches!(
            authz.require_admin(&manager, "update settings"),
            Err(AppError::Forbidden(_))
        ));
        assert!(authz.has_any_role(&manager, &[UserRole::Admin, UserRole::Manager]));
    }

    #[test]
    fn test_vehicle_scope() {
        let authz = AuthorizationService::new();
        let own = Uuid::new_v4();
        let driver = actor(UserRole::Driver, Some(own));

        assert_eq!(authz.vehicle_scope(&driver, None, "list alerts").unwrap(), Some(own));
        assert!(authz.vehicle_scope(&driver, Some(Uuid::new_v4()), "list alerts").is_err());
        assert!(authz
            .vehicle_scope(&actor(UserRole::Driver, None), None, "list alerts")
            .is_err());
        assert_eq!(authz.vehicle_scope(&actor(UserRole::Admin, None), None, "list alerts").unwrap(), None);
    }
}
