use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::alert::{Alert, AlertFilter, NewAlert};
use crate::models::pagination::{Page, PageRequest};
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Debug, Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fire(&self, vehicle_id: Uuid, alert: &NewAlert) -> AppResult<Alert> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, vehicle_id, alert).await
    }

    pub async fn insert(conn: &mut PgConnection, vehicle_id: Uuid, alert: &NewAlert) -> AppResult<Alert> {
        sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (id, vehicle_id, kind, message, cycle)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vehicle_id)
        .bind(alert.kind)
        .bind(&alert.message)
        .bind(alert.cycle)
        .fetch_one(conn)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                not_found_error("Vehicle", &vehicle_id.to_string())
            }
            _ => AppError::Database(e),
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Alert>> {
        let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(alert)
    }

    /// Keeps the first acknowledgement timestamp on repeated calls
    pub async fn acknowledge(&self, id: Uuid) -> AppResult<Alert> {
        sqlx::query_as::<_, Alert>(
            r#"
            UPDATE alerts
            SET acknowledged = TRUE, acknowledged_at = COALESCE(acknowledged_at, NOW())
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found_error("Alert", &id.to_string()))
    }

    pub async fn list(&self, filter: &AlertFilter, page: PageRequest) -> AppResult<Page<Alert>> {
        let alerts = sqlx::query_as::<_, Alert>(
            r#"
            SELECT * FROM alerts
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
              AND ($2::boolean IS NULL OR acknowledged = $2)
            ORDER BY triggered_at DESC, seq DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filter.vehicle_id)
        .bind(filter.acknowledged)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM alerts
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
              AND ($2::boolean IS NULL OR acknowledged = $2)
            "#,
        )
        .bind(filter.vehicle_id)
        .bind(filter.acknowledged)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(alerts, total.max(0) as u64, page))
    }

    /// Single statement, so concurrent inserts are either fully in or out
    pub async fn acknowledge_all(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE alerts SET acknowledged = TRUE, acknowledged_at = NOW() WHERE acknowledged = FALSE",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
