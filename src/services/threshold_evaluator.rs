//! Threshold evaluator
//!
//! Pure mapping from a vehicle's previous state and a new odometer reading to
//! its new status and the alert (if any) that the reading triggers.
//!
//! Alerts are edge-triggered: `LIMIT_EXCEEDED` fires on the transition into
//! that state, `NEAR_LIMIT` only on the transition `ACTIVE -> NEAR_LIMIT`.
//! Only the start and end state of one update are compared, so a single jump
//! from `ACTIVE` past the limit fires `LIMIT_EXCEEDED` alone. The fired flags
//! guard each threshold for the rest of the cycle; entering a new cycle
//! re-arms both.
//!
//! `remaining` is computed per [`CycleMode`]:
//! - `ServiceBaseline`: `limit - (mileage - last_service_mileage)`.
//! - `OdometerModulo`: `limit - (mileage mod limit)`, where an exact positive
//!   multiple of the limit is a full cycle (`remaining = 0`), not a fresh one.

use crate::models::alert::AlertKind;
use crate::models::settings::{CycleMode, ThresholdConfig};
use crate::models::vehicle::{MileageUpdate, ServiceReset, Vehicle, VehicleStatus};

/// Vehicle state before the reading, plus the reading itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationInput {
    pub current_status: VehicleStatus,
    pub previous_mileage: i64,
    pub new_mileage: i64,
    /// Odometer value at the last maintenance reset
    pub service_baseline: i64,
    pub service_cycle: i64,
    pub warning_fired: bool,
    pub critical_fired: bool,
}

impl EvaluationInput {
    pub fn for_reading(vehicle: &Vehicle, new_mileage: i64) -> Self {
        Self {
            current_status: vehicle.status,
            previous_mileage: vehicle.current_mileage,
            new_mileage,
            service_baseline: vehicle.last_service_mileage,
            service_cycle: vehicle.service_cycle,
            warning_fired: vehicle.warning_fired,
            critical_fired: vehicle.critical_fired,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub status: VehicleStatus,
    /// Miles left in the current cycle; zero or negative once exceeded
    pub remaining: i64,
    pub cycle: i64,
    /// The reading moved the vehicle into a new cycle
    pub rearmed: bool,
    pub alert: Option<AlertKind>,
    pub warning_fired: bool,
    pub critical_fired: bool,
}

impl Evaluation {
    /// Registry fields to persist for this reading
    pub fn mileage_update(&self, new_mileage: i64) -> MileageUpdate {
        MileageUpdate {
            current_mileage: new_mileage,
            status: self.status,
            warning_fired: self.warning_fired,
            critical_fired: self.critical_fired,
        }
    }
}

/// Cycle index and miles remaining in it for an odometer value
pub fn cycle_position(mileage: i64, input: &EvaluationInput, config: &ThresholdConfig) -> (i64, i64) {
    let limit = config.mileage_limit;
    match config.cycle_mode {
        CycleMode::ServiceBaseline => {
            let cycle_mileage = (mileage - input.service_baseline).max(0);
            (input.service_cycle, limit - cycle_mileage)
        }
        CycleMode::OdometerModulo => {
            if mileage <= 0 {
                return (0, limit);
            }
            let cycle = (mileage - 1) / limit;
            let in_cycle = mileage - cycle * limit;
            (cycle, limit - in_cycle)
        }
    }
}

/// Status for a number of remaining miles; both boundaries are inclusive
pub fn classify(remaining: i64, warning_margin: i64) -> VehicleStatus {
    if remaining <= 0 {
        VehicleStatus::LimitExceeded
    } else if remaining <= warning_margin {
        VehicleStatus::NearLimit
    } else {
        VehicleStatus::Active
    }
}

pub fn evaluate(input: &EvaluationInput, config: &ThresholdConfig) -> Evaluation {
    let (previous_cycle, _) = cycle_position(input.previous_mileage, input, config);
    let (cycle, remaining) = cycle_position(input.new_mileage, input, config);
    let rearmed = cycle > previous_cycle;

    let (prior_status, mut warning_fired, mut critical_fired) = if rearmed {
        (VehicleStatus::Active, false, false)
    } else {
        (input.current_status, input.warning_fired, input.critical_fired)
    };

    let status = classify(remaining, config.warning_margin);

    let alert = match status {
        VehicleStatus::LimitExceeded if prior_status != VehicleStatus::LimitExceeded && !critical_fired => {
            critical_fired = true;
            Some(AlertKind::LimitExceeded)
        }
        VehicleStatus::NearLimit if prior_status == VehicleStatus::Active && !warning_fired => {
            warning_fired = true;
            Some(AlertKind::NearLimit)
        }
        _ => None,
    };

    Evaluation {
        status,
        remaining,
        cycle,
        rearmed,
        alert,
        warning_fired,
        critical_fired,
    }
}

/// Registry state after a maintenance reset at the current odometer.
///
/// The service baseline and cycle always advance. In `OdometerModulo` mode the
/// threshold cycle is fixed by the odometer, so the status is re-derived and
/// the fired flags stay with the modulo cycle they belong to.
pub fn service_reset(vehicle: &Vehicle, config: &ThresholdConfig) -> ServiceReset {
    let mut input = EvaluationInput::for_reading(vehicle, vehicle.current_mileage);
    input.service_baseline = vehicle.current_mileage;
    input.service_cycle = vehicle.service_cycle + 1;

    let (_, remaining) = cycle_position(vehicle.current_mileage, &input, config);
    let (warning_fired, critical_fired) = match config.cycle_mode {
        CycleMode::ServiceBaseline => (false, false),
        CycleMode::OdometerModulo => (vehicle.warning_fired, vehicle.critical_fired),
    };

    ServiceReset {
        service_mileage: input.service_baseline,
        service_cycle: input.service_cycle,
        status: classify(remaining, config.warning_margin),
        warning_fired,
        critical_fired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ThresholdConfig {
        ThresholdConfig::new(5000, 200)
    }

    fn fresh(new_mileage: i64) -> EvaluationInput {
        EvaluationInput {
            current_status: VehicleStatus::Active,
            previous_mileage: 0,
            new_mileage,
            service_baseline: 0,
            service_cycle: 0,
            warning_fired: false,
            critical_fired: false,
        }
    }

    /// Feed readings one after another, carrying state forward
    fn run(readings: &[i64], config: &ThresholdConfig) -> (Vec<Evaluation>, EvaluationInput) {
        let mut state = fresh(0);
        let mut out = Vec::new();
        for &reading in readings {
            state.new_mileage = reading;
            let evaluation = evaluate(&state, config);
            state.previous_mileage = reading;
            state.current_status = evaluation.status;
            state.warning_fired = evaluation.warning_fired;
            state.critical_fired = evaluation.critical_fired;
            out.push(evaluation);
        }
        (out, state)
    }

    fn alerts(evaluations: &[Evaluation]) -> Vec<AlertKind> {
        evaluations.iter().filter_map(|e| e.alert).collect()
    }

    #[test]
    fn test_limit_is_inclusive() {
        let evaluation = evaluate(&fresh(5000), &config());
        assert_eq!(evaluation.status, VehicleStatus::LimitExceeded);
        assert_eq!(evaluation.remaining, 0);
    }

    #[test]
    fn test_warning_boundary_is_inclusive() {
        let evaluation = evaluate(&fresh(4800), &config());
        assert_eq!(evaluation.status, VehicleStatus::NearLimit);
        assert_eq!(evaluation.remaining, 200);

        let below = evaluate(&fresh(4799), &config());
        assert_eq!(below.status, VehicleStatus::Active);
    }

    #[test]
    fn test_near_limit_fires_once_per_crossing() {
        let (evaluations, _) = run(&[4700, 4750, 4850, 4900], &config());
        assert_eq!(alerts(&evaluations), vec![AlertKind::NearLimit]);
        assert_eq!(evaluations[2].alert, Some(AlertKind::NearLimit));
        assert_eq!(evaluations[2].remaining, 150);
    }

    #[test]
    fn test_single_jump_fires_only_exceeded() {
        let evaluation = evaluate(&fresh(5000), &config());
        assert_eq!(evaluation.alert, Some(AlertKind::LimitExceeded));
        assert!(evaluation.critical_fired);
        assert!(!evaluation.warning_fired);
    }

    #[test]
    fn test_no_refire_while_exceeded() {
        let (evaluations, state) = run(&[5000, 5100, 5200], &config());
        assert_eq!(alerts(&evaluations), vec![AlertKind::LimitExceeded]);
        assert_eq!(state.current_status, VehicleStatus::LimitExceeded);
    }

    #[test]
    fn test_warning_then_critical() {
        let (evaluations, _) = run(&[4850, 4990, 5001], &config());
        assert_eq!(alerts(&evaluations), vec![AlertKind::NearLimit, AlertKind::LimitExceeded]);
    }

    #[test]
    fn test_fired_flag_blocks_refire_even_if_status_drops() {
        // margin narrowed after the warning fired: status falls back to ACTIVE
        let mut input = fresh(4850);
        input.previous_mileage = 4820;
        input.current_status = VehicleStatus::Active;
        input.warning_fired = true;
        let evaluation = evaluate(&input, &config());
        assert_eq!(evaluation.status, VehicleStatus::NearLimit);
        assert_eq!(evaluation.alert, None);
    }

    #[test]
    fn test_service_baseline_measures_from_last_reset() {
        let mut input = fresh(9850);
        input.previous_mileage = 6000;
        input.service_baseline = 5000;
        input.service_cycle = 1;
        let evaluation = evaluate(&input, &config());
        assert_eq!(evaluation.remaining, 150);
        assert_eq!(evaluation.status, VehicleStatus::NearLimit);
        assert_eq!(evaluation.alert, Some(AlertKind::NearLimit));
        assert_eq!(evaluation.cycle, 1);
        assert!(!evaluation.rearmed);
    }

    #[test]
    fn test_modulo_exact_multiple_is_full_cycle() {
        let config = config().with_cycle_mode(CycleMode::OdometerModulo);
        let evaluation = evaluate(&fresh(10_000), &config);
        assert_eq!(evaluation.remaining, 0);
        assert_eq!(evaluation.cycle, 1);
        assert_eq!(evaluation.status, VehicleStatus::LimitExceeded);
    }

    #[test]
    fn test_modulo_rearms_in_next_cycle() {
        let config = config().with_cycle_mode(CycleMode::OdometerModulo);
        let (evaluations, state) = run(&[4850, 5000, 5100, 9850, 10_000], &config);

        assert_eq!(
            alerts(&evaluations),
            vec![
                AlertKind::NearLimit,
                AlertKind::LimitExceeded,
                AlertKind::NearLimit,
                AlertKind::LimitExceeded,
            ]
        );
        assert!(evaluations[2].rearmed);
        assert_eq!(evaluations[2].status, VehicleStatus::Active);
        assert_eq!(state.current_status, VehicleStatus::LimitExceeded);
    }

    #[test]
    fn test_modulo_jump_across_cycles_while_exceeded() {
        let config = config().with_cycle_mode(CycleMode::OdometerModulo);
        let (evaluations, _) = run(&[5000, 10_000], &config);
        assert_eq!(alerts(&evaluations), vec![AlertKind::LimitExceeded, AlertKind::LimitExceeded]);
        assert!(evaluations[1].rearmed);
    }

    #[test]
    fn test_modulo_zero_mileage_has_full_cycle() {
        let config = config().with_cycle_mode(CycleMode::OdometerModulo);
        let input = fresh(0);
        assert_eq!(cycle_position(0, &input, &config), (0, 5000));
    }

    fn serviced_at(mileage: i64, status: VehicleStatus) -> Vehicle {
        let mut vehicle = crate::models::vehicle::NewVehicle {
            registration_number: "KX19 ABC".to_string(),
            fleet_number: None,
            vehicle_type: None,
            assigned_driver_id: None,
            mileage_limit: 5000,
            warning_margin: None,
            initial_mileage: mileage,
        }
        .into_vehicle(chrono::Utc::now());
        vehicle.status = status;
        vehicle.warning_fired = true;
        vehicle
    }

    #[test]
    fn test_service_reset_starts_fresh_baseline_cycle() {
        let reset = service_reset(&serviced_at(4850, VehicleStatus::NearLimit), &config());
        assert_eq!(reset.service_mileage, 4850);
        assert_eq!(reset.service_cycle, 1);
        assert_eq!(reset.status, VehicleStatus::Active);
        assert!(!reset.warning_fired);
        assert!(!reset.critical_fired);
    }

    #[test]
    fn test_service_reset_keeps_modulo_cycle_state() {
        let config = config().with_cycle_mode(CycleMode::OdometerModulo);
        let reset = service_reset(&serviced_at(4850, VehicleStatus::NearLimit), &config);
        assert_eq!(reset.service_mileage, 4850);
        assert_eq!(reset.service_cycle, 1);
        assert_eq!(reset.status, VehicleStatus::NearLimit);
        assert!(reset.warning_fired);
    }
}
