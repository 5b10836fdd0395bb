use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::models::mileage::{HistoryQuery, MileageEntry, MileageRecord, NewMileageRecord};
use crate::models::pagination::{Page, PageRequest};
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Ledger row joined with its predecessor's reading
#[derive(Debug, FromRow)]
struct EntryRow {
    #[sqlx(flatten)]
    record: MileageRecord,
    previous_mileage: i64,
}

impl From<EntryRow> for MileageEntry {
    fn from(row: EntryRow) -> Self {
        MileageEntry {
            miles_added: row.record.recorded_mileage - row.previous_mileage,
            previous_mileage: row.previous_mileage,
            record: row.record,
        }
    }
}

/// `mileage_records` access. Rows are insert-only (enforced by a trigger).
#[derive(Debug, Clone)]
pub struct MileageRepository {
    pool: PgPool,
}

impl MileageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, record: &NewMileageRecord) -> AppResult<MileageRecord> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, record).await
    }

    pub async fn insert(conn: &mut PgConnection, record: &NewMileageRecord) -> AppResult<MileageRecord> {
        sqlx::query_as::<_, MileageRecord>(
            r#"
            INSERT INTO mileage_records (id, vehicle_id, recorded_mileage, recorded_at, recorded_by, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.vehicle_id)
        .bind(record.recorded_mileage)
        .bind(record.recorded_at)
        .bind(record.recorded_by)
        .bind(&record.notes)
        .fetch_one(conn)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                not_found_error("Vehicle", &record.vehicle_id.to_string())
            }
            _ => AppError::Database(e),
        })
    }

    pub async fn latest_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<MileageRecord>> {
        let record = sqlx::query_as::<_, MileageRecord>(
            r#"
            SELECT * FROM mileage_records
            WHERE vehicle_id = $1
            ORDER BY recorded_at DESC, seq DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Deltas come from `LAG` over the filtered range, so pagination never
    /// changes a record's predecessor.
    pub async fn list_for_vehicle(
        &self,
        vehicle_id: Uuid,
        query: &HistoryQuery,
        page: PageRequest,
    ) -> AppResult<Page<MileageEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            WITH scoped AS (
                SELECT r.*,
                       COALESCE(LAG(r.recorded_mileage) OVER (ORDER BY r.recorded_at, r.seq), 0) AS previous_mileage
                FROM mileage_records r
                WHERE r.vehicle_id = $1
                  AND ($2::timestamptz IS NULL OR r.recorded_at >= $2)
                  AND ($3::timestamptz IS NULL OR r.recorded_at <= $3)
            )
            SELECT * FROM scoped
            ORDER BY recorded_at DESC, seq DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(vehicle_id)
        .bind(query.from)
        .bind(query.to)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM mileage_records
            WHERE vehicle_id = $1
              AND ($2::timestamptz IS NULL OR recorded_at >= $2)
              AND ($3::timestamptz IS NULL OR recorded_at <= $3)
            "#,
        )
        .bind(vehicle_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&self.pool)
        .await?;

        let items = rows.into_iter().map(MileageEntry::from).collect();
        Ok(Page::new(items, total.max(0) as u64, page))
    }
}
