use skylane_proto::TelemetrySample;

use crate::destination::Destination;
use crate::geo::haversine_m;

#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalReport {
    pub distance_m: f64,
    /// `None` when ground speed is too low to extrapolate.
    pub eta_s: Option<f64>,
    pub arrived: bool,
    pub progress_pct: f64,
}

#[derive(Debug, Clone)]
pub struct ArrivalEvaluator {
    eta_min_speed_mps: f64,
}

impl ArrivalEvaluator {
    pub fn new(eta_min_speed_mps: f64) -> Self {
        Self { eta_min_speed_mps }
    }

    pub fn distance_m(&self, sample: &TelemetrySample, dest: &Destination) -> f64 {
        haversine_m(sample.lat, sample.lon, dest.lat, dest.lon)
    }

    /// `baseline_m` is the straight-line distance captured at registration.
    pub fn evaluate(
        &self,
        sample: &TelemetrySample,
        dest: &Destination,
        baseline_m: Option<f64>,
    ) -> ArrivalReport {
        let distance_m = self.distance_m(sample, dest);
        let speed = sample.ground_speed_mps as f64;
        let eta_s = if speed.is_finite() && speed >= self.eta_min_speed_mps {
            Some(distance_m / speed)
        } else {
            None
        };
        ArrivalReport {
            distance_m,
            eta_s,
            arrived: distance_m <= dest.arrival_radius_m,
            progress_pct: progress_pct(distance_m, baseline_m.unwrap_or(distance_m)),
        }
    }
}

/// Share of the registration-time distance already covered, in [0, 100].
pub fn progress_pct(distance_m: f64, baseline_m: f64) -> f64 {
    if baseline_m <= f64::EPSILON {
        return 100.0;
    }
    ((1.0 - distance_m / baseline_m) * 100.0).clamp(0.0, 100.0)
}
