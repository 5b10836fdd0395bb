//! Mileage ledger model
//!
//! Ledger entries are immutable. `previous_mileage` and `miles_added` are not
//! stored; they are derived from the chronological predecessor at read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One odometer reading as stored in `mileage_records`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MileageRecord {
    pub id: Uuid,
    /// Insertion order, breaks ties between equal timestamps
    pub seq: i64,
    pub vehicle_id: Uuid,
    pub recorded_mileage: i64,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Uuid,
    pub notes: Option<String>,
}

/// Reading to append to the ledger
#[derive(Debug, Clone)]
pub struct NewMileageRecord {
    pub vehicle_id: Uuid,
    pub recorded_mileage: i64,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Uuid,
    pub notes: Option<String>,
}

/// Ledger entry enriched with its derived delta
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MileageEntry {
    #[serde(flatten)]
    pub record: MileageRecord,
    pub previous_mileage: i64,
    pub miles_added: i64,
}

/// Filters for a vehicle's history
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl HistoryQuery {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }
}

/// Pair every record with its chronological predecessor.
///
/// Input order does not matter; output is oldest first. The oldest record in
/// scope reports `previous_mileage = 0`.
pub fn derive_deltas(mut records: Vec<MileageRecord>) -> Vec<MileageEntry> {
    records.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.seq.cmp(&b.seq)));

    let mut previous = 0;
    records
        .into_iter()
        .map(|record| {
            let entry = MileageEntry {
                previous_mileage: previous,
                miles_added: record.recorded_mileage - previous,
                record,
            };
            previous = entry.record.recorded_mileage;
            entry
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(seq: i64, at: DateTime<Utc>, mileage: i64) -> MileageRecord {
        MileageRecord {
            id: Uuid::new_v4(),
            seq,
            vehicle_id: Uuid::nil(),
            recorded_mileage: mileage,
            recorded_at: at,
            recorded_by: Uuid::nil(),
            notes: None,
        }
    }

    #[test]
    fn test_deltas_follow_timestamps_not_insertion() {
        let t1 = Utc::now();
        let t2 = t1 + Duration::minutes(5);
        let t3 = t2 + Duration::minutes(5);

        // inserted as t3, t1, t2
        let entries = derive_deltas(vec![record(1, t3, 700), record(2, t1, 100), record(3, t2, 300)]);

        let deltas: Vec<(i64, i64)> = entries.iter().map(|e| (e.previous_mileage, e.miles_added)).collect();
        assert_eq!(deltas, vec![(0, 100), (100, 200), (300, 400)]);
    }

    #[test]
    fn test_equal_timestamps_use_insertion_order() {
        let t = Utc::now();
        let entries = derive_deltas(vec![record(2, t, 250), record(1, t, 200)]);
        assert_eq!(entries[0].record.recorded_mileage, 200);
        assert_eq!(entries[1].miles_added, 50);
    }

    #[test]
    fn test_empty_ledger() {
        assert!(derive_deltas(Vec::new()).is_empty());
    }

    #[test]
    fn test_history_query_bounds_are_inclusive() {
        let t = Utc::now();
        let query = HistoryQuery { from: Some(t), to: Some(t) };
        assert!(query.contains(t));
        assert!(!query.contains(t + Duration::seconds(1)));
    }
}
