//! Navigation lifecycle supervisor.
//!
//! Turns one `navigate` request into the full go-to, land and touchdown
//! sequence. The caller polls `monitor`; each poll reads one telemetry sample,
//! moves the session forward by at most one phase and returns a payload that
//! says what to do next. There is no background task: nothing happens
//! between polls.

use skylane_proto::rpc::CancelReply;
use skylane_proto::{
    ActionRequired, LandReply, LandedState, MonitorPayload, NavigateReply, Phase, TelemetrySample,
    VehicleApi, VehicleStatus,
};
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::arrival::{ArrivalEvaluator, ArrivalReport};
use crate::config::SupervisorConfig;
use crate::destination::{Destination, DestinationRegistry};
use crate::error::NavError;
use crate::gate::{GateDecision, LandingGate};
use crate::session::FlightSession;
use crate::touchdown::{TouchdownConfirmer, TouchdownVerdict};

#[derive(Debug, Clone, PartialEq)]
pub struct NavigateRequest {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f32,
    pub arrival_radius_m: Option<f64>,
    pub auto_land: Option<bool>,
}

pub struct FlightSupervisor<V: VehicleApi> {
    vehicle: V,
    config: SupervisorConfig,
    registry: DestinationRegistry,
    evaluator: ArrivalEvaluator,
    gate: LandingGate,
    confirmer: TouchdownConfirmer,
    /// Last payload of a completed session, replayed on further polls.
    terminal: Option<MonitorPayload>,
}

/// Outcome of evaluating one sample against the current phase,
/// before anything is committed to the session.
struct StepPlan {
    next: Option<Phase>,
    send_land: bool,
    text: String,
    action: ActionRequired,
}

fn fmt_eta(eta_s: Option<f64>) -> String {
    match eta_s {
        Some(s) => format!("{:.0} s", s),
        None => "unknown".to_string(),
    }
}

impl<V: VehicleApi> FlightSupervisor<V> {
    pub fn new(vehicle: V, config: SupervisorConfig) -> Self {
        Self {
            vehicle,
            evaluator: config.arrival_evaluator(),
            confirmer: TouchdownConfirmer::new(config.touchdown_policy()),
            gate: LandingGate,
            registry: DestinationRegistry::new(),
            terminal: None,
            config,
        }
    }

    pub fn vehicle(&self) -> &V {
        &self.vehicle
    }

    pub fn vehicle_mut(&mut self) -> &mut V {
        &mut self.vehicle
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&FlightSession> {
        self.registry.session()
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.registry.current()
    }

    /// Phase of the active session, or of the retained terminal payload.
    pub fn phase(&self) -> Option<Phase> {
        self.registry
            .session()
            .map(|s| s.phase())
            .or_else(|| self.terminal.as_ref().map(|p| p.phase))
    }

    pub fn status(&self) -> VehicleStatus {
        self.vehicle.status()
    }

    /// Validates, sends the goto, then replaces any active session.
    /// On error the previous session is left exactly as it was.
    pub fn navigate(&mut self, req: NavigateRequest, now: OffsetDateTime) -> Result<NavigateReply, NavError> {
        let radius = req.arrival_radius_m.unwrap_or(self.config.default_arrival_radius_m);
        let auto_land = req.auto_land.unwrap_or(self.config.auto_land);
        let dest = Destination::new(req.lat, req.lon, req.alt_m, radius, now)?;

        self.vehicle
            .goto_location(dest.lat, dest.lon, dest.alt_m)
            .map_err(|e| NavError::link("goto", e))?;

        let baseline = match self.vehicle.read_telemetry() {
            Ok(s) => Some(self.evaluator.distance_m(&s, &dest)),
            Err(e) => {
                warn!("baseline telemetry read failed, deferring to first monitor: {:#}", e);
                None
            }
        };

        let info = dest.info();
        let replaced = self.registry.register(FlightSession::new(dest, auto_land, baseline));
        self.terminal = None;

        let dist_txt = baseline
            .map(|d| format!("{:.0} m away", d))
            .unwrap_or_else(|| "distance pending".to_string());
        let display_text = format!(
            "NAVIGATING to {:.6}, {:.6} at {:.1} m ({}), arrival radius {:.1} m, auto-land {}{}",
            info.lat,
            info.lon,
            info.alt_m,
            dist_txt,
            info.arrival_radius_m,
            if auto_land { "on" } else { "off" },
            if replaced.is_some() { ". Previous navigation was abandoned" } else { "" },
        );

        Ok(NavigateReply {
            registered: true,
            destination: info,
            auto_land,
            replaced_previous: replaced.is_some(),
            distance_m: baseline,
            display_text,
            action_required: ActionRequired::CallMonitorAgain,
        })
    }

    /// One evaluation step.
    pub fn monitor(&mut self) -> Result<MonitorPayload, NavError> {
        let Some(session) = self.registry.session() else {
            return self.terminal.clone().ok_or(NavError::StaleSession);
        };
        if session.phase() == Phase::TouchdownTimeout {
            return Err(timeout_error(&self.config, session));
        }

        let sample = self
            .vehicle
            .read_telemetry()
            .map_err(|e| NavError::link("read telemetry", e))?;
        self.step(sample)
    }

    fn step(&mut self, sample: TelemetrySample) -> Result<MonitorPayload, NavError> {
        let Self { vehicle, config, registry, evaluator, gate, confirmer, terminal } = self;
        let Some(session) = registry.session_mut() else {
            return Err(NavError::StaleSession);
        };

        let baseline = match session.baseline_distance_m() {
            Some(b) => b,
            None => evaluator.distance_m(&sample, &session.destination),
        };
        let report = evaluator.evaluate(&sample, &session.destination, Some(baseline));
        let mut run = session.stable().clone();
        let radius = session.destination.arrival_radius_m;

        let plan = match session.phase() {
            Phase::Navigating if report.arrived => StepPlan {
                next: Some(Phase::Arrived),
                send_land: false,
                text: format!(
                    "ARRIVED: {:.1} m from destination (radius {:.1} m){}",
                    report.distance_m,
                    radius,
                    if session.auto_land {
                        ", landing starts on the next monitor call"
                    } else {
                        ", auto-land is off so call land to descend"
                    }
                ),
                action: if session.auto_land { ActionRequired::CallMonitorAgain } else { ActionRequired::CallLand },
            },
            Phase::Navigating => StepPlan {
                next: None,
                send_land: false,
                text: format!(
                    "NAVIGATING: {:.0} m to go, alt {:.1} m, {:.1} m/s, ETA {}, {:.0}% complete",
                    report.distance_m,
                    sample.alt_m,
                    sample.ground_speed_mps,
                    fmt_eta(report.eta_s),
                    report.progress_pct
                ),
                action: ActionRequired::CallMonitorAgain,
            },
            Phase::Arrived if session.auto_land && !session.land_command_sent() => {
                let decision = gate.authorize_land(Some(&*session), false, |_| Ok(report.distance_m))?;
                match decision {
                    GateDecision::Allow => StepPlan {
                        next: Some(Phase::Landing),
                        send_land: true,
                        text: format!(
                            "LANDING: auto-land commanded {:.1} m from destination, alt {:.1} m",
                            report.distance_m, sample.alt_m
                        ),
                        action: ActionRequired::CallMonitorAgain,
                    },
                    GateDecision::Deny { reason, .. } => StepPlan {
                        next: None,
                        send_land: false,
                        text: format!("ARRIVED: holding before auto-land, {}", reason),
                        action: ActionRequired::CallMonitorAgain,
                    },
                }
            }
            Phase::Arrived => StepPlan {
                next: None,
                send_land: false,
                text: format!(
                    "ARRIVED: hovering {:.1} m from destination at {:.1} m, waiting for land",
                    report.distance_m, sample.alt_m
                ),
                action: ActionRequired::CallLand,
            },
            Phase::Landing
                if matches!(sample.landed_state, LandedState::Landing | LandedState::OnGround) =>
            {
                StepPlan {
                    next: Some(Phase::ConfirmingTouchdown),
                    send_land: false,
                    text: format!(
                        "CONFIRMING TOUCHDOWN: descent reported ({}), alt {:.1} m, vertical speed {:.1} m/s",
                        sample.landed_state.as_str(),
                        sample.alt_m,
                        sample.vertical_speed_mps
                    ),
                    action: ActionRequired::CallMonitorAgain,
                }
            }
            Phase::Landing => StepPlan {
                next: None,
                send_land: false,
                text: format!(
                    "LANDING: waiting for descent, state {}, alt {:.1} m",
                    sample.landed_state.as_str(),
                    sample.alt_m
                ),
                action: ActionRequired::CallMonitorAgain,
            },
            Phase::ConfirmingTouchdown => {
                let verdict = confirmer.observe(&mut run, &sample);
                let in_phase = session
                    .confirming_since()
                    .map(|t| sample.ts - t)
                    .unwrap_or(time::Duration::ZERO);
                match verdict {
                    TouchdownVerdict::Confirmed { count, held_s } => StepPlan {
                        next: Some(Phase::Complete),
                        send_land: false,
                        text: format!(
                            "MISSION COMPLETE: touchdown confirmed by {} stable samples over {:.1} s, {:.0} s total flight",
                            count,
                            held_s,
                            (sample.ts - session.started_at()).as_seconds_f64().max(0.0)
                        ),
                        action: ActionRequired::MissionCompleteStopCalling,
                    },
                    _ if in_phase >= config.touchdown_timeout() => StepPlan {
                        next: Some(Phase::TouchdownTimeout),
                        send_land: false,
                        text: String::new(),
                        action: ActionRequired::ManualInterventionRequired,
                    },
                    TouchdownVerdict::Settling { count, held_s } => StepPlan {
                        next: None,
                        send_land: false,
                        text: format!(
                            "CONFIRMING TOUCHDOWN: {} stable samples over {:.1} s (need {} over {:.1} s), alt {:.1} m",
                            count,
                            held_s,
                            confirmer.policy().min_samples,
                            config.stable_duration_s,
                            sample.alt_m
                        ),
                        action: ActionRequired::CallMonitorAgain,
                    },
                    _ => StepPlan {
                        next: None,
                        send_land: false,
                        text: format!(
                            "CONFIRMING TOUCHDOWN: not settled yet, state {}, alt {:.1} m, {:.1} m/s",
                            sample.landed_state.as_str(),
                            sample.alt_m,
                            sample.ground_speed_mps
                        ),
                        action: ActionRequired::CallMonitorAgain,
                    },
                }
            }
            Phase::Complete | Phase::TouchdownTimeout => return Err(NavError::StaleSession),
        };

        if plan.send_land {
            info!("auto-land: sending land command");
            vehicle.land().map_err(|e| NavError::link("land", e))?;
            session.mark_land_sent();
        }

        // Commit. Nothing above this line has touched the session except the
        // land guard, which is only set once the command went out.
        session.record_poll(sample.ts);
        session.set_baseline(baseline);
        if session.phase() == Phase::ConfirmingTouchdown {
            session.set_stable(run);
        }
        if let Some(next) = plan.next {
            session.advance(next, sample.ts);
        }

        if session.phase() == Phase::TouchdownTimeout {
            let err = NavError::TouchdownTimeout {
                elapsed_s: session
                    .confirming_since()
                    .map(|t| (sample.ts - t).as_seconds_f64())
                    .unwrap_or(config.touchdown_timeout_s),
            };
            error!("{}", err);
            return Err(err);
        }

        let payload = build_payload(session, &report, &sample, plan.text, plan.action);
        if payload.mission_complete {
            info!("mission complete, clearing destination");
            *terminal = Some(payload.clone());
            registry.clear();
        }
        Ok(payload)
    }

    /// Explicit land request, guarded by the landing gate.
    pub fn land(&mut self, force: bool) -> Result<LandReply, NavError> {
        let Self { vehicle, config, registry, evaluator, gate, .. } = self;

        let phase = registry.session().map(|s| s.phase());
        match phase {
            Some(Phase::TouchdownTimeout) => {
                let s = registry.session().ok_or(NavError::StaleSession)?;
                return Err(timeout_error(config, s));
            }
            Some(Phase::Landing | Phase::ConfirmingTouchdown | Phase::Complete) => {
                info!("land requested while already landing, no new command sent");
                return Ok(LandReply {
                    accepted: true,
                    forced: force,
                    command_issued: false,
                    display_text: "LANDING: land was already commanded for this arrival, keep monitoring touchdown".to_string(),
                    action_required: ActionRequired::CallMonitorAgain,
                });
            }
            _ => {}
        }

        let decision = gate.authorize_land(registry.session(), force, |dest| {
            let s = vehicle
                .read_telemetry()
                .map_err(|e| NavError::link("read telemetry", e))?;
            Ok(evaluator.distance_m(&s, dest))
        })?;

        if let GateDecision::Deny { distance_m, threshold_m, .. } = decision {
            return Err(NavError::LandingBlocked { distance_m, threshold_m });
        }

        info!("sending land command (force={})", force);
        vehicle.land().map_err(|e| NavError::link("land", e))?;

        let (display_text, action_required) = match registry.session_mut() {
            Some(session) => {
                session.mark_land_sent();
                let at = session.last_poll().unwrap_or_else(OffsetDateTime::now_utc);
                session.advance(Phase::Landing, at);
                (
                    format!(
                        "LANDING: land command accepted{}, call monitor until touchdown is confirmed",
                        if force { " (forced)" } else { "" }
                    ),
                    ActionRequired::CallMonitorAgain,
                )
            }
            None => (
                "LANDING: land command accepted, no navigation is being supervised".to_string(),
                ActionRequired::CallNavigate,
            ),
        };

        Ok(LandReply { accepted: true, forced: force, command_issued: true, display_text, action_required })
    }

    /// Drops the active session and any retained terminal result.
    pub fn cancel(&mut self) -> CancelReply {
        let had_session = self.registry.clear().is_some();
        let had_terminal = self.terminal.take().is_some();
        if had_session {
            warn!("navigation cancelled by caller");
        }
        CancelReply {
            cancelled: had_session || had_terminal,
            display_text: if had_session {
                "CANCELLED: navigation supervision stopped, the vehicle keeps its current command".to_string()
            } else {
                "CANCELLED: no navigation was active".to_string()
            },
            action_required: ActionRequired::CallNavigate,
        }
    }
}

fn timeout_error(config: &SupervisorConfig, session: &FlightSession) -> NavError {
    let elapsed_s = match (session.confirming_since(), session.last_poll()) {
        (Some(a), Some(b)) => (b - a).as_seconds_f64(),
        _ => config.touchdown_timeout_s,
    };
    NavError::TouchdownTimeout { elapsed_s }
}

fn build_payload(
    session: &FlightSession,
    report: &ArrivalReport,
    sample: &TelemetrySample,
    display_text: String,
    action_required: ActionRequired,
) -> MonitorPayload {
    let phase = session.phase();
    MonitorPayload {
        phase,
        distance_m: report.distance_m,
        altitude_m: sample.alt_m,
        speed_mps: sample.ground_speed_mps,
        eta_s: report.eta_s,
        progress_pct: report.progress_pct,
        elapsed_s: session.elapsed_s(),
        stable_samples: session.stable().count,
        display_text,
        action_required,
        mission_complete: phase == Phase::Complete,
    }
}
