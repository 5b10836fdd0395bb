//! Estado de la aplicación
//!
//! Compartido por todos los handlers: configuración, backend de
//! almacenamiento y los servicios montados encima.

use std::sync::Arc;

use axum::extract::FromRef;
use tracing::info;

use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::repositories::{FleetStore, MemoryFleetStore};
use crate::services::{
    ActivityService, ActivitySink, AlertService, FanoutActivitySink, InMemorySettings, MaintenanceService,
    MileageService, SettingsProvider, SettingsService, StoreActivitySink, VehicleLocks, VehicleService,
    WebhookActivitySink,
};
use crate::utils::errors::AppResult;
use crate::utils::jwt::JwtConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn FleetStore>,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitState,
    pub vehicles: VehicleService,
    pub mileage: MileageService,
    pub alerts: AlertService,
    pub maintenance: MaintenanceService,
    pub settings: SettingsService,
    pub activity: ActivityService,
}

impl AppState {
    /// Monta los servicios sobre `store`, con el webhook si está configurado
    pub fn new(config: EnvironmentConfig, store: Arc<dyn FleetStore>) -> AppResult<Self> {
        let mut sinks: Vec<Arc<dyn ActivitySink>> = vec![Arc::new(StoreActivitySink::new(store.clone()))];
        if let Some(url) = &config.activity_webhook_url {
            info!("📣 Activity webhook enabled: {}", url);
            sinks.push(Arc::new(WebhookActivitySink::new(url.clone())?));
        }

        let sink: Arc<dyn ActivitySink> = Arc::new(FanoutActivitySink::new(sinks));
        Ok(Self::with_activity_sink(config, store, sink))
    }

    pub fn with_activity_sink(
        config: EnvironmentConfig,
        store: Arc<dyn FleetStore>,
        sink: Arc<dyn ActivitySink>,
    ) -> Self {
        let settings: Arc<dyn SettingsProvider> = Arc::new(InMemorySettings::from_config(&config));
        let activity = ActivityService::new(sink);
        let locks = VehicleLocks::new();

        Self {
            jwt: JwtConfig::from(&config),
            rate_limit: RateLimitState::new(&config),
            vehicles: VehicleService::new(store.clone(), settings.clone(), activity.clone()),
            mileage: MileageService::new(store.clone(), settings.clone(), activity.clone(), locks.clone())
                .with_max_attempts(config.recording_max_attempts),
            alerts: AlertService::new(store.clone(), activity.clone()),
            maintenance: MaintenanceService::new(store.clone(), settings.clone(), activity.clone(), locks)
                .with_max_attempts(config.recording_max_attempts),
            settings: SettingsService::new(settings, activity.clone()),
            activity,
            store,
            config,
        }
    }

    /// Estado en memoria; la actividad se guarda en el mismo store
    pub fn in_memory(config: EnvironmentConfig) -> Self {
        let store: Arc<dyn FleetStore> = Arc::new(MemoryFleetStore::new());
        let sink: Arc<dyn ActivitySink> = Arc::new(StoreActivitySink::new(store.clone()));
        Self::with_activity_sink(config, store, sink)
    }
}

impl FromRef<AppState> for JwtConfig {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for RateLimitState {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limit.clone()
    }
}
