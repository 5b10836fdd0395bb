use sqlx::PgPool;

use crate::models::activity::ActivityEvent;
use crate::utils::errors::AppResult;

#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: PgPool,
}

impl ActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &ActivityEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (id, kind, message, vehicle_id, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id)
        .bind(event.kind)
        .bind(&event.message)
        .bind(event.vehicle_id)
        .bind(event.user_id)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn recent(&self, limit: u32) -> AppResult<Vec<ActivityEvent>> {
        let events = sqlx::query_as::<_, ActivityEvent>(
            "SELECT id, kind, message, vehicle_id, user_id, created_at FROM activity_log ORDER BY created_at DESC, seq DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
