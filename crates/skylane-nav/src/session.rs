use skylane_proto::Phase;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::destination::Destination;
use crate::touchdown::StableRun;

/// Mutable state of one navigation attempt.
#[derive(Debug, Clone)]
pub struct FlightSession {
    pub destination: Destination,
    pub auto_land: bool,
    phase: Phase,
    started_at: OffsetDateTime,
    last_poll: Option<OffsetDateTime>,
    baseline_distance_m: Option<f64>,
    land_command_sent: bool,
    confirming_since: Option<OffsetDateTime>,
    stable: StableRun,
}

fn rank(p: Phase) -> u8 {
    match p {
        Phase::Navigating => 0,
        Phase::Arrived => 1,
        Phase::Landing => 2,
        Phase::ConfirmingTouchdown => 3,
        Phase::Complete | Phase::TouchdownTimeout => 4,
    }
}

impl FlightSession {
    pub fn new(destination: Destination, auto_land: bool, baseline_distance_m: Option<f64>) -> Self {
        let started_at = destination.registered_at;
        Self {
            destination,
            auto_land,
            phase: Phase::Navigating,
            started_at,
            last_poll: None,
            baseline_distance_m,
            land_command_sent: false,
            confirming_since: None,
            stable: StableRun::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }

    pub fn last_poll(&self) -> Option<OffsetDateTime> {
        self.last_poll
    }

    pub fn baseline_distance_m(&self) -> Option<f64> {
        self.baseline_distance_m
    }

    pub fn land_command_sent(&self) -> bool {
        self.land_command_sent
    }

    pub fn confirming_since(&self) -> Option<OffsetDateTime> {
        self.confirming_since
    }

    pub fn stable(&self) -> &StableRun {
        &self.stable
    }

    /// Seconds since registration, as of the last poll.
    pub fn elapsed_s(&self) -> f64 {
        self.last_poll
            .map(|t| (t - self.started_at).as_seconds_f64().max(0.0))
            .unwrap_or(0.0)
    }

    pub(crate) fn record_poll(&mut self, ts: OffsetDateTime) {
        self.last_poll = Some(ts);
    }

    pub(crate) fn set_baseline(&mut self, distance_m: f64) {
        self.baseline_distance_m.get_or_insert(distance_m);
    }

    pub(crate) fn set_stable(&mut self, run: StableRun) {
        self.stable = run;
    }

    pub(crate) fn mark_land_sent(&mut self) {
        self.land_command_sent = true;
    }

    /// Forward-only transition. Returns false (and changes nothing) otherwise.
    pub(crate) fn advance(&mut self, next: Phase, at: OffsetDateTime) -> bool {
        if rank(next) <= rank(self.phase) {
            warn!("ignored backward transition {} -> {}", self.phase.as_str(), next.as_str());
            return false;
        }
        info!("phase {} -> {}", self.phase.as_str(), next.as_str());
        if next == Phase::ConfirmingTouchdown {
            self.confirming_since = Some(at);
        }
        self.phase = next;
        true
    }
}
