//! Per-vehicle async locks
//!
//! Serializes recordings and maintenance resets for one vehicle inside this
//! process. Cross-process safety comes from the store's row lock and
//! optimistic mileage check; this just keeps same-vehicle requests from
//! racing each other into retries.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct VehicleLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl VehicleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `vehicle_id`; released on drop
    pub async fn acquire(&self, vehicle_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(vehicle_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Vehicles with a live lock entry
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_vehicle_is_serialized() {
        let locks = VehicleLocks::new();
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_vehicles_do_not_block() {
        let locks = VehicleLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = VehicleLocks::new();
        drop(locks.acquire(Uuid::new_v4()).await);
        let _held = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.tracked().await, 1);
    }
}
