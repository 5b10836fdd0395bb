//! Prometheus metrics
//!
//! Counters live in a dedicated registry rendered by `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::models::alert::AlertKind;
use crate::utils::errors::{AppError, AppResult};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Recording attempts by final outcome
    pub static ref MILEAGE_RECORDINGS_TOTAL: IntCounterVec = {
        let c = IntCounterVec::new(
            Opts::new("fleet_mileage_recordings_total", "mileage recordings by outcome"),
            &["outcome"],
        )
        .unwrap_or_else(|e| panic!("recordings counter: {e}"));
        REGISTRY
            .register(Box::new(c.clone()))
            .unwrap_or_else(|e| panic!("register recordings counter: {e}"));
        c
    };

    pub static ref ALERTS_FIRED_TOTAL: IntCounterVec = {
        let c = IntCounterVec::new(
            Opts::new("fleet_alerts_fired_total", "threshold alerts fired by kind"),
            &["kind"],
        )
        .unwrap_or_else(|e| panic!("alerts counter: {e}"));
        REGISTRY
            .register(Box::new(c.clone()))
            .unwrap_or_else(|e| panic!("register alerts counter: {e}"));
        c
    };

    /// Commits retried after a stale read or transient storage failure
    pub static ref RECORDING_RETRIES_TOTAL: IntCounter = {
        let c = IntCounter::new("fleet_recording_retries_total", "mileage commits retried")
            .unwrap_or_else(|e| panic!("retries counter: {e}"));
        REGISTRY
            .register(Box::new(c.clone()))
            .unwrap_or_else(|e| panic!("register retries counter: {e}"));
        c
    };
}

/// Metric label for a recording result
pub fn outcome_label<T>(result: &AppResult<T>) -> &'static str {
    match result {
        Ok(_) => "accepted",
        Err(AppError::InvalidMileage { .. }) => "invalid_mileage",
        Err(AppError::DuplicateSubmission { .. }) => "duplicate",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::Forbidden(_)) => "forbidden",
        Err(AppError::StaleVehicle(_)) => "stale",
        Err(_) => "error",
    }
}

pub fn record_outcome<T>(result: &AppResult<T>) {
    MILEAGE_RECORDINGS_TOTAL.with_label_values(&[outcome_label(result)]).inc();
}

pub fn record_alert(kind: AlertKind) {
    ALERTS_FIRED_TOTAL.with_label_values(&[kind.as_str()]).inc();
}

/// Render every registered metric in the text exposition format
pub fn render() -> AppResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| AppError::Internal(format!("Metrics are not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        record_alert(AlertKind::NearLimit);
        record_outcome(&Ok::<(), AppError>(()));
        let text = render().unwrap();
        assert!(text.contains("fleet_alerts_fired_total"));
        assert!(text.contains("fleet_mileage_recordings_total"));
    }
}
