use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::maintenance::MaintenanceRecord;
use crate::models::pagination::{Page, PageRequest};
use crate::utils::errors::AppResult;

#[derive(Debug, Clone)]
pub struct MaintenanceRepository {
    pool: PgPool,
}

impl MaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(conn: &mut PgConnection, record: &MaintenanceRecord) -> AppResult<MaintenanceRecord> {
        let saved = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            INSERT INTO maintenance_records (
                id, vehicle_id, description, artisan_name, company_name, contact_number,
                cost, notes, mileage_at_service, reset_mileage, service_date, submitted_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.vehicle_id)
        .bind(&record.description)
        .bind(&record.artisan_name)
        .bind(&record.company_name)
        .bind(&record.contact_number)
        .bind(record.cost)
        .bind(&record.notes)
        .bind(record.mileage_at_service)
        .bind(record.reset_mileage)
        .bind(record.service_date)
        .bind(record.submitted_by)
        .bind(record.created_at)
        .fetch_one(conn)
        .await?;

        Ok(saved)
    }

    pub async fn list(&self, vehicle_id: Option<Uuid>, page: PageRequest) -> AppResult<Page<MaintenanceRecord>> {
        let records = sqlx::query_as::<_, MaintenanceRecord>(
            r#"
            SELECT * FROM maintenance_records
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
            ORDER BY service_date DESC, created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(vehicle_id)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM maintenance_records WHERE ($1::uuid IS NULL OR vehicle_id = $1)")
                .bind(vehicle_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Page::new(records, total.max(0) as u64, page))
    }
}
