//! Configuración de entorno
//!
//! Lee las variables del proceso (después de que `dotenvy` cargue `.env`) en
//! un [`EnvironmentConfig`] tipado. Los valores por defecto siguen la política
//! de la flota: límite de 5000 millas y margen de aviso de 200 millas.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::models::settings::CycleMode;

pub const DEFAULT_MILEAGE_LIMIT: i64 = 5000;
pub const DEFAULT_WARNING_MARGIN: i64 = 200;
pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 60;

/// Dónde se persisten vehículos, lecturas y alertas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

/// Configuración del servicio
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    // Business rules
    pub mileage_limit: i64,
    pub warning_margin: i64,
    pub cycle_mode: CycleMode,
    pub duplicate_window_secs: i64,
    pub recording_max_attempts: u32,
    pub activity_webhook_url: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            database_url: None,
            storage_backend: StorageBackend::Memory,
            jwt_secret: "development-secret".to_string(),
            cors_origins: Vec::new(),
            rate_limit_requests: 600,
            rate_limit_window: 60,
            mileage_limit: DEFAULT_MILEAGE_LIMIT,
            warning_margin: DEFAULT_WARNING_MARGIN,
            cycle_mode: CycleMode::ServiceBaseline,
            duplicate_window_secs: DEFAULT_DUPLICATE_WINDOW_SECS,
            recording_max_attempts: 3,
            activity_webhook_url: None,
        }
    }
}

/// Parsea una variable opcional; usa `default` si no está definida
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{} must be valid: {}", name, e)),
        _ => Ok(default),
    }
}

impl EnvironmentConfig {
    /// Cargar la configuración desde el entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let storage_backend = parse_var("STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORAGE_BACKEND=postgres"));
        }

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if environment != "production" => defaults.jwt_secret,
            Err(e) => return Err(e).context("JWT_SECRET must be set in production"),
        };

        let config = Self {
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            database_url,
            storage_backend,
            jwt_secret,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_requests: parse_var("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
            rate_limit_window: parse_var("RATE_LIMIT_WINDOW", defaults.rate_limit_window)?,
            mileage_limit: parse_var("MILEAGE_LIMIT", defaults.mileage_limit)?,
            warning_margin: parse_var("WARNING_THRESHOLD", defaults.warning_margin)?,
            cycle_mode: parse_var("CYCLE_MODE", defaults.cycle_mode)?,
            duplicate_window_secs: parse_var("DUPLICATE_WINDOW_SECS", defaults.duplicate_window_secs)?,
            recording_max_attempts: parse_var("RECORDING_MAX_ATTEMPTS", defaults.recording_max_attempts)?,
            activity_webhook_url: env::var("ACTIVITY_WEBHOOK_URL").ok().filter(|u| !u.is_empty()),
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rechaza reglas de negocio que dejarían al evaluador sin sentido
    pub fn validate(&self) -> Result<()> {
        if self.mileage_limit <= 0 {
            return Err(anyhow!("MILEAGE_LIMIT must be positive"));
        }
        if self.warning_margin < 0 || self.warning_margin >= self.mileage_limit {
            return Err(anyhow!("WARNING_THRESHOLD must be in [0, MILEAGE_LIMIT)"));
        }
        if self.duplicate_window_secs < 0 {
            return Err(anyhow!("DUPLICATE_WINDOW_SECS must not be negative"));
        }
        if self.recording_max_attempts == 0 {
            return Err(anyhow!("RECORDING_MAX_ATTEMPTS must be at least 1"));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Dirección donde escucha el servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_fleet_policy() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.mileage_limit, 5000);
        assert_eq!(config.warning_margin, 200);
        assert_eq!(config.duplicate_window_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_margin_must_fit_inside_limit() {
        let config = EnvironmentConfig {
            warning_margin: 5000,
            ..EnvironmentConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("PostgreSQL".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_server_url() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.server_url(), "0.0.0.0:3000");
    }
}
