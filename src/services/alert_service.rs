use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::activity::{ActivityEvent, ActivityKind};
use crate::models::alert::{Alert, AlertFilter};
use crate::models::auth::Actor;
use crate::models::pagination::{Page, PageRequest};
use crate::models::vehicle::VehicleRef;
use crate::repositories::FleetStore;
use crate::services::activity_service::ActivityService;
use crate::services::authorization_service::AuthorizationService;
use crate::services::vehicle_service::resolve_vehicle;
use crate::utils::errors::{not_found_error, AppResult};

/// Alert listing and acknowledgement
#[derive(Clone)]
pub struct AlertService {
    store: Arc<dyn FleetStore>,
    activity: ActivityService,
    authz: AuthorizationService,
}

impl AlertService {
    pub fn new(store: Arc<dyn FleetStore>, activity: ActivityService) -> Self {
        Self {
            store,
            activity,
            authz: AuthorizationService::new(),
        }
    }

    /// Newest first; drivers only ever see their own vehicle's alerts
    pub async fn list(
        &self,
        vehicle: Option<&VehicleRef>,
        acknowledged: Option<bool>,
        page: PageRequest,
        actor: &Actor,
    ) -> AppResult<Page<Alert>> {
        let requested = match vehicle {
            Some(reference) => Some(resolve_vehicle(self.store.as_ref(), reference).await?.id),
            None => None,
        };

        let filter = AlertFilter {
            vehicle_id: self.authz.vehicle_scope(actor, requested, "list alerts")?,
            acknowledged,
        };
        self.store.list_alerts(&filter, page).await
    }

    /// Idempotent: acknowledging twice returns the same alert
    pub async fn acknowledge(&self, id: Uuid, actor: &Actor) -> AppResult<Alert> {
        let alert = self
            .store
            .get_alert(id)
            .await?
            .ok_or_else(|| not_found_error("Alert", &id.to_string()))?;
        self.authz.ensure_vehicle_access(actor, alert.vehicle_id, "acknowledge alert")?;

        if alert.acknowledged {
            return Ok(alert);
        }
        self.store.acknowledge(id).await
    }

    pub async fn acknowledge_all(&self, actor: &Actor) -> AppResult<u64> {
        self.authz.require_fleet_manager(actor, "acknowledge all alerts")?;

        let count = self.store.acknowledge_all().await?;
        info!("✅ {} alerts acknowledged", count);

        if count > 0 {
            self.activity
                .record(
                    ActivityEvent::new(ActivityKind::Alert, format!("{} alerts acknowledged", count))
                        .by_user(actor.user_id),
                )
                .await;
        }

        Ok(count)
    }
}
