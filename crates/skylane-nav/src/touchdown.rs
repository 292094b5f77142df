//! Debounced touchdown detection.
//!
//! A single on-ground reading is not enough: baro and GPS noise near the
//! ground produce short false positives. Touchdown is confirmed only after
//! `min_samples` consecutive stable samples spanning at least `min_duration`.

use skylane_proto::{LandedState, TelemetrySample};
use time::{Duration, OffsetDateTime};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TouchdownPolicy {
    pub ground_altitude_m: f32,
    pub ground_speed_mps: f32,
    pub min_samples: u32,
    pub min_duration: Duration,
    pub require_disarmed: bool,
}

/// Current run of consecutive stable samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StableRun {
    pub count: u32,
    pub since: Option<OffsetDateTime>,
}

impl StableRun {
    fn reset(&mut self) {
        self.count = 0;
        self.since = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TouchdownVerdict {
    Unstable,
    Settling { count: u32, held_s: f64 },
    Confirmed { count: u32, held_s: f64 },
}

#[derive(Debug, Clone)]
pub struct TouchdownConfirmer {
    policy: TouchdownPolicy,
}

impl TouchdownConfirmer {
    pub fn new(policy: TouchdownPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TouchdownPolicy {
        &self.policy
    }

    pub fn is_stable(&self, s: &TelemetrySample) -> bool {
        let p = &self.policy;
        s.landed_state == LandedState::OnGround
            && (!p.require_disarmed || !s.armed)
            && s.alt_m <= p.ground_altitude_m
            && s.ground_speed_mps < p.ground_speed_mps
    }

    /// Folds one sample into `run`. Any unstable sample restarts the run.
    pub fn observe(&self, run: &mut StableRun, s: &TelemetrySample) -> TouchdownVerdict {
        if !self.is_stable(s) {
            if run.count > 0 {
                debug!(
                    "touchdown run reset after {} samples (state={} alt={:.2} gs={:.2})",
                    run.count, s.landed_state.as_str(), s.alt_m, s.ground_speed_mps
                );
            }
            run.reset();
            return TouchdownVerdict::Unstable;
        }

        let since = *run.since.get_or_insert(s.ts);
        run.count += 1;
        let held = s.ts - since;
        let held_s = held.as_seconds_f64();

        if run.count >= self.policy.min_samples && held >= self.policy.min_duration {
            TouchdownVerdict::Confirmed { count: run.count, held_s }
        } else {
            TouchdownVerdict::Settling { count: run.count, held_s }
        }
    }
}
