use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::vehicle::{MileageUpdate, Vehicle};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

/// `vehicles` table access
#[derive(Debug, Clone)]
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, vehicle).await
    }

    /// Insert on a caller-owned connection so registration can share a transaction
    pub async fn insert(conn: &mut PgConnection, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let created = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (
                id, registration_number, fleet_number, vehicle_type, assigned_driver_id,
                mileage_limit, warning_margin, current_mileage, last_service_mileage,
                service_cycle, status, warning_fired, critical_fired, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.registration_number)
        .bind(&vehicle.fleet_number)
        .bind(&vehicle.vehicle_type)
        .bind(vehicle.assigned_driver_id)
        .bind(vehicle.mileage_limit)
        .bind(vehicle.warning_margin)
        .bind(vehicle.current_mileage)
        .bind(vehicle.last_service_mileage)
        .bind(vehicle.service_cycle)
        .bind(vehicle.status)
        .bind(vehicle.warning_fired)
        .bind(vehicle.critical_fired)
        .bind(vehicle.created_at)
        .bind(vehicle.updated_at)
        .fetch_one(conn)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                if db.constraint() == Some("vehicles_fleet_number_key") {
                    conflict_error("Vehicle", "fleet number", vehicle.fleet_number.as_deref().unwrap_or_default())
                } else {
                    conflict_error("Vehicle", "registration number", &vehicle.registration_number)
                }
            }
            _ => AppError::Database(e),
        })?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(vehicle)
    }

    /// Fleet number wins over registration number when both could match
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT * FROM vehicles
            WHERE deleted_at IS NULL AND (fleet_number = $1 OR registration_number = $1)
            ORDER BY (fleet_number = $1) DESC NULLS LAST
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    pub async fn list(&self, include_deleted: bool) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE ($1 OR deleted_at IS NULL) ORDER BY created_at DESC",
        )
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }

    pub async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Vehicle> {
        let deleted = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles SET deleted_at = $2, updated_at = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        match deleted {
            Some(vehicle) => Ok(vehicle),
            None => match self.find_by_id(id).await? {
                Some(vehicle) => Err(AppError::Conflict(format!(
                    "Vehicle '{}' is already deleted",
                    vehicle.label()
                ))),
                None => Err(not_found_error("Vehicle", &id.to_string())),
            },
        }
    }

    /// Row-lock a live vehicle for the rest of the transaction
    pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| not_found_error("Vehicle", &id.to_string()))
    }

    pub async fn apply_mileage_update(conn: &mut PgConnection, id: Uuid, update: &MileageUpdate) -> AppResult<Vehicle> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET current_mileage = $2, status = $3, warning_fired = $4, critical_fired = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.current_mileage)
        .bind(update.status)
        .bind(update.warning_fired)
        .bind(update.critical_fired)
        .fetch_one(conn)
        .await?;

        Ok(vehicle)
    }

    /// Persist a maintenance reset already applied to `vehicle`
    pub async fn save_service_state(conn: &mut PgConnection, vehicle: &Vehicle) -> AppResult<Vehicle> {
        let saved = sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles
            SET last_service_mileage = $2, service_cycle = $3, status = $4,
                warning_fired = $5, critical_fired = $6, updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(vehicle.id)
        .bind(vehicle.last_service_mileage)
        .bind(vehicle.service_cycle)
        .bind(vehicle.status)
        .bind(vehicle.warning_fired)
        .bind(vehicle.critical_fired)
        .bind(vehicle.updated_at)
        .fetch_one(conn)
        .await?;

        Ok(saved)
    }
}
