//! Settings provider
//!
//! Fleet-wide defaults live in process memory, seeded from configuration and
//! updatable at runtime by an admin. Services snapshot them per request.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::environment::EnvironmentConfig;
use crate::models::activity::{ActivityEvent, ActivityKind};
use crate::models::auth::Actor;
use crate::models::settings::{FleetSettings, SettingsPatch};
use crate::utils::errors::{AppError, AppResult};
use crate::services::activity_service::ActivityService;
use crate::services::authorization_service::AuthorizationService;
use crate::utils::validation::{field_error, validate_non_negative, validate_positive};

#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn current(&self) -> FleetSettings;

    async fn update(&self, patch: SettingsPatch) -> AppResult<FleetSettings>;
}

#[derive(Debug)]
pub struct InMemorySettings {
    settings: RwLock<FleetSettings>,
}

impl InMemorySettings {
    pub fn new(settings: FleetSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(FleetSettings {
            default_mileage_limit: config.mileage_limit,
            warning_margin: config.warning_margin,
            cycle_mode: config.cycle_mode,
            duplicate_window_secs: config.duplicate_window_secs,
        })
    }
}

fn validate_patch(patch: &SettingsPatch) -> AppResult<()> {
    if let Some(limit) = patch.default_mileage_limit {
        validate_positive(limit).map_err(|e| AppError::Validation(field_error("default_mileage_limit", e)))?;
    }
    if let Some(margin) = patch.warning_margin {
        validate_non_negative(margin).map_err(|e| AppError::Validation(field_error("warning_margin", e)))?;
    }
    if let Some(window) = patch.duplicate_window_secs {
        validate_non_negative(window).map_err(|e| AppError::Validation(field_error("duplicate_window_secs", e)))?;
    }
    Ok(())
}

#[async_trait]
impl SettingsProvider for InMemorySettings {
    async fn current(&self) -> FleetSettings {
        self.settings.read().await.clone()
    }

    async fn update(&self, patch: SettingsPatch) -> AppResult<FleetSettings> {
        validate_patch(&patch)?;

        let mut settings = self.settings.write().await;
        if let Some(limit) = patch.default_mileage_limit {
            settings.default_mileage_limit = limit;
        }
        if let Some(margin) = patch.warning_margin {
            settings.warning_margin = margin;
        }
        if let Some(mode) = patch.cycle_mode {
            settings.cycle_mode = mode;
        }
        if let Some(window) = patch.duplicate_window_secs {
            settings.duplicate_window_secs = window;
        }
        Ok(settings.clone())
    }
}

/// Admin-facing settings operations
#[derive(Clone)]
pub struct SettingsService {
    provider: Arc<dyn SettingsProvider>,
    activity: ActivityService,
    authz: AuthorizationService,
}

impl SettingsService {
    pub fn new(provider: Arc<dyn SettingsProvider>, activity: ActivityService) -> Self {
        Self {
            provider,
            activity,
            authz: AuthorizationService::new(),
        }
    }

    pub async fn current(&self) -> FleetSettings {
        self.provider.current().await
    }

    pub async fn update(&self, patch: SettingsPatch, actor: &Actor) -> AppResult<FleetSettings> {
        self.authz.require_admin(actor, "update settings")?;

        let settings = self.provider.update(patch).await?;
        info!(
            "⚙️ Settings updated: limit {}, margin {}, mode {}",
            settings.default_mileage_limit, settings.warning_margin, settings.cycle_mode
        );
        self.activity
            .record(
                ActivityEvent::new(
                    ActivityKind::Settings,
                    format!(
                        "Settings updated: default limit {} miles, warning margin {} miles",
                        settings.default_mileage_limit, settings.warning_margin
                    ),
                )
                .by_user(actor.user_id),
            )
            .await;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::CycleMode;

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let provider = InMemorySettings::from_config(&EnvironmentConfig::default());
        let updated = provider
            .update(SettingsPatch {
                warning_margin: Some(300),
                cycle_mode: Some(CycleMode::OdometerModulo),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.warning_margin, 300);
        assert_eq!(updated.default_mileage_limit, 5000);
        assert_eq!(provider.current().await.cycle_mode, CycleMode::OdometerModulo);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_limit() {
        let provider = InMemorySettings::from_config(&EnvironmentConfig::default());
        let err = provider
            .update(SettingsPatch {
                default_mileage_limit: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(provider.current().await.default_mileage_limit, 5000);
    }
}
