//! Fleet-wide settings
//!
//! Settings are snapshotted into a [`ThresholdConfig`] for every evaluation,
//! never read from a global by the evaluator itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::vehicle::Vehicle;

/// How threshold cycles are delimited
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleMode {
    /// Cycle mileage is measured from the last maintenance reset; alerts
    /// re-arm only when a reset happens.
    #[default]
    ServiceBaseline,
    /// Every `mileage_limit` miles of odometer is a new cycle.
    OdometerModulo,
}

impl FromStr for CycleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service_baseline" | "baseline" => Ok(CycleMode::ServiceBaseline),
            "odometer_modulo" | "modulo" => Ok(CycleMode::OdometerModulo),
            other => Err(format!("unknown cycle mode '{}'", other)),
        }
    }
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleMode::ServiceBaseline => f.write_str("SERVICE_BASELINE"),
            CycleMode::OdometerModulo => f.write_str("ODOMETER_MODULO"),
        }
    }
}

/// Runtime-updatable defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FleetSettings {
    pub default_mileage_limit: i64,
    pub warning_margin: i64,
    pub cycle_mode: CycleMode,
    pub duplicate_window_secs: i64,
}

impl FleetSettings {
    /// Thresholds for one vehicle, applying its per-vehicle overrides
    pub fn thresholds_for(&self, vehicle: &Vehicle) -> ThresholdConfig {
        ThresholdConfig {
            mileage_limit: vehicle.mileage_limit,
            warning_margin: vehicle.warning_margin.unwrap_or(self.warning_margin),
            cycle_mode: self.cycle_mode,
        }
    }
}

/// Explicit evaluator configuration, passed per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdConfig {
    pub mileage_limit: i64,
    pub warning_margin: i64,
    pub cycle_mode: CycleMode,
}

impl ThresholdConfig {
    pub fn new(mileage_limit: i64, warning_margin: i64) -> Self {
        Self {
            mileage_limit,
            warning_margin,
            cycle_mode: CycleMode::ServiceBaseline,
        }
    }

    pub fn with_cycle_mode(mut self, cycle_mode: CycleMode) -> Self {
        self.cycle_mode = cycle_mode;
        self
    }
}

/// Partial update accepted by `PUT /api/settings`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub default_mileage_limit: Option<i64>,
    pub warning_margin: Option<i64>,
    pub cycle_mode: Option<CycleMode>,
    pub duplicate_window_secs: Option<i64>,
}
