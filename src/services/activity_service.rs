//! Activity log
//!
//! Audit events are fire-and-forget. A failing sink is logged and ignored;
//! it never fails the operation that produced the event.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::models::activity::ActivityEvent;
use crate::repositories::FleetStore;
use crate::utils::errors::{AppError, AppResult};

/// Destination for audit events
#[async_trait]
pub trait ActivitySink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn emit(&self, event: &ActivityEvent) -> AppResult<()>;
}

/// Persists events to the fleet store
pub struct StoreActivitySink {
    store: Arc<dyn FleetStore>,
}

impl StoreActivitySink {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActivitySink for StoreActivitySink {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn emit(&self, event: &ActivityEvent) -> AppResult<()> {
        self.store.log_activity(event).await
    }
}

/// POSTs each event as JSON to an external collector
pub struct WebhookActivitySink {
    client: reqwest::Client,
    url: String,
}

impl WebhookActivitySink {
    pub fn new(url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build webhook client: {}", e)))?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl ActivitySink for WebhookActivitySink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn emit(&self, event: &ActivityEvent) -> AppResult<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::ExternalApi(format!("Activity webhook failed: {}", e)))?;

        Ok(())
    }
}

/// Delivers to every inner sink concurrently
pub struct FanoutActivitySink {
    sinks: Vec<Arc<dyn ActivitySink>>,
}

impl FanoutActivitySink {
    pub fn new(sinks: Vec<Arc<dyn ActivitySink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl ActivitySink for FanoutActivitySink {
    fn name(&self) -> &'static str {
        "fanout"
    }

    /// Every sink is attempted; the first failure (if any) is reported
    async fn emit(&self, event: &ActivityEvent) -> AppResult<()> {
        let results = join_all(self.sinks.iter().map(|sink| sink.emit(event))).await;

        let mut first_error = None;
        for (sink, result) in self.sinks.iter().zip(results) {
            if let Err(e) = result {
                warn!("⚠️ Activity sink '{}' failed: {}", sink.name(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct ActivityService {
    sink: Arc<dyn ActivitySink>,
}

impl ActivityService {
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self { sink }
    }

    /// Emit an event; failures are logged and swallowed
    pub async fn record(&self, event: ActivityEvent) {
        match self.sink.emit(&event).await {
            Ok(()) => debug!("Activity [{:?}] {}", event.kind, event.message),
            Err(e) => warn!("⚠️ Dropping activity event '{}': {}", event.message, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::ActivityKind;
    use crate::repositories::{ActivityLog, MemoryFleetStore};

    struct FailingSink;

    #[async_trait]
    impl ActivitySink for FailingSink {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn emit(&self, _event: &ActivityEvent) -> AppResult<()> {
            Err(AppError::ExternalApi("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_fanout_still_delivers_to_healthy_sinks() {
        let store = Arc::new(MemoryFleetStore::new());
        let fanout = FanoutActivitySink::new(vec![
            Arc::new(FailingSink),
            Arc::new(StoreActivitySink::new(store.clone())),
        ]);

        let result = fanout.emit(&ActivityEvent::new(ActivityKind::Mileage, "recorded")).await;
        assert!(result.is_err());
        assert_eq!(store.recent_activity(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_service_swallows_sink_failures() {
        let service = ActivityService::new(Arc::new(FailingSink));
        // must not panic or propagate
        service.record(ActivityEvent::new(ActivityKind::Alert, "fired")).await;
    }
}
