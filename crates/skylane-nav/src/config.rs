use serde::Deserialize;

use crate::arrival::ArrivalEvaluator;
use crate::touchdown::TouchdownPolicy;

/// Operational thresholds for the `[supervisor]` config section.
/// Every field is optional; missing values take the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Used when navigate does not pass an arrival radius.
    pub default_arrival_radius_m: f64,

    /// Used when navigate does not say whether to auto-land.
    pub auto_land: bool,

    /// Below this ground speed the ETA is reported as unknown.
    pub eta_min_speed_mps: f64,

    /// Max height above takeoff for a sample to count as on the ground.
    pub ground_altitude_m: f32,

    /// Max ground speed for a sample to count as at rest.
    pub ground_speed_mps: f32,

    /// Consecutive stable samples needed to confirm touchdown.
    pub min_stable_samples: u32,

    /// Minimum wall-clock span of those samples.
    pub stable_duration_s: f64,

    /// Bound on time spent in ConfirmingTouchdown.
    pub touchdown_timeout_s: f64,

    /// If true, a stable sample must also report disarmed.
    pub require_disarmed: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            default_arrival_radius_m: 10.0,
            auto_land: true,
            eta_min_speed_mps: 0.1,
            ground_altitude_m: 2.0,
            ground_speed_mps: 0.5,
            min_stable_samples: 3,
            stable_duration_s: 3.0,
            touchdown_timeout_s: 120.0,
            require_disarmed: false,
        }
    }
}

impl SupervisorConfig {
    pub fn touchdown_policy(&self) -> TouchdownPolicy {
        TouchdownPolicy {
            ground_altitude_m: self.ground_altitude_m,
            ground_speed_mps: self.ground_speed_mps,
            min_samples: self.min_stable_samples,
            min_duration: time::Duration::saturating_seconds_f64(self.stable_duration_s),
            require_disarmed: self.require_disarmed,
        }
    }

    pub fn arrival_evaluator(&self) -> ArrivalEvaluator {
        ArrivalEvaluator::new(self.eta_min_speed_mps)
    }

    pub fn touchdown_timeout(&self) -> time::Duration {
        time::Duration::saturating_seconds_f64(self.touchdown_timeout_s)
    }
}
