use std::collections::VecDeque;

use skylane_nav::geo::offset_m;
use skylane_nav::{FlightSupervisor, NavError, NavigateRequest, SupervisorConfig};
use skylane_proto::{ActionRequired, LandedState, Phase, TelemetrySample, VehicleApi};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

const ORIGIN: (f64, f64) = (47.397742, 8.545594);
const T0: OffsetDateTime = datetime!(2025-03-01 12:00 UTC);

#[derive(Default)]
struct ScriptedVehicle {
    script: VecDeque<Result<TelemetrySample, String>>,
    reads: usize,
    land_calls: usize,
    fail_next_land: bool,
    fail_next_goto: bool,
    gotos: Vec<(f64, f64, f32)>,
}

impl VehicleApi for ScriptedVehicle {
    fn read_telemetry(&mut self) -> anyhow::Result<TelemetrySample> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Ok(s)) => Ok(s),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => anyhow::bail!("telemetry script exhausted"),
        }
    }

    fn goto_location(&mut self, lat: f64, lon: f64, alt_m: f32) -> anyhow::Result<()> {
        if self.fail_next_goto {
            self.fail_next_goto = false;
            anyhow::bail!("REPOSITION rate-limited, retry in 800 ms");
        }
        self.gotos.push((lat, lon, alt_m));
        Ok(())
    }

    fn land(&mut self) -> anyhow::Result<()> {
        if self.fail_next_land {
            self.fail_next_land = false;
            anyhow::bail!("COMMAND_ACK timeout");
        }
        self.land_calls += 1;
        Ok(())
    }
}

fn at(north_m: f64, alt_m: f32, gs: f32, state: LandedState, secs: f64) -> TelemetrySample {
    let (lat, lon) = offset_m(ORIGIN.0, ORIGIN.1, north_m, 0.0);
    TelemetrySample {
        lat,
        lon,
        alt_m,
        ground_speed_mps: gs,
        vertical_speed_mps: 0.0,
        landed_state: state,
        armed: true,
        ts: T0 + Duration::seconds_f64(secs),
    }
}

fn flying(north_m: f64, secs: f64) -> TelemetrySample {
    at(north_m, 50.0, 10.0, LandedState::InAir, secs)
}

fn grounded(north_m: f64, secs: f64) -> TelemetrySample {
    at(north_m, 0.1, 0.0, LandedState::OnGround, secs)
}

fn push(sup: &mut FlightSupervisor<ScriptedVehicle>, s: TelemetrySample) {
    sup.vehicle_mut().script.push_back(Ok(s));
}

fn request_north(north_m: f64, auto_land: bool) -> NavigateRequest {
    let (lat, lon) = offset_m(ORIGIN.0, ORIGIN.1, north_m, 0.0);
    NavigateRequest { lat, lon, alt_m: 50.0, arrival_radius_m: Some(10.0), auto_land: Some(auto_land) }
}

fn supervisor() -> FlightSupervisor<ScriptedVehicle> {
    FlightSupervisor::new(ScriptedVehicle::default(), SupervisorConfig::default())
}

/// Navigate 1 km north and fly until the session is in ConfirmingTouchdown.
/// Returns the seconds value of the last sample used.
fn fly_to_confirming(sup: &mut FlightSupervisor<ScriptedVehicle>) -> f64 {
    push(sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();

    push(sup, flying(995.0, 100.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::Arrived);
    push(sup, flying(998.0, 101.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::Landing);
    push(sup, at(998.0, 20.0, 0.2, LandedState::Landing, 110.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::ConfirmingTouchdown);
    110.0
}

#[test]
fn far_destination_stays_navigating_and_never_lands() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();

    for i in 1..=20 {
        let north = (i as f64) * 10.0;
        push(&mut sup, flying(north, i as f64));
        let p = sup.monitor().unwrap();
        assert_eq!(p.phase, Phase::Navigating);
        assert_eq!(p.action_required, ActionRequired::CallMonitorAgain);
        assert!(!p.mission_complete);
    }
    assert_eq!(sup.vehicle().land_calls, 0);
}

#[test]
fn full_lifecycle_from_1km_out() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    let reply = sup.navigate(request_north(1000.0, true), T0).unwrap();
    assert!(reply.registered);
    assert!(!reply.replaced_previous);
    assert!((reply.distance_m.unwrap() - 1000.0).abs() < 1.0);
    assert_eq!(sup.vehicle().gotos.len(), 1);

    push(&mut sup, flying(0.0, 1.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Navigating);
    let eta = p.eta_s.unwrap();
    assert!((eta - 100.0).abs() < 1.0, "eta {}", eta);
    assert!(p.progress_pct < 1.0);

    push(&mut sup, flying(500.0, 50.0));
    let p = sup.monitor().unwrap();
    assert!((p.progress_pct - 50.0).abs() < 1.0);
    assert!((p.elapsed_s - 50.0).abs() < 1e-6);

    // converge inside the 10 m radius
    push(&mut sup, at(995.0, 50.0, 1.0, LandedState::InAir, 100.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Arrived);
    assert_eq!(sup.vehicle().land_calls, 0);

    push(&mut sup, at(997.0, 50.0, 0.3, LandedState::InAir, 101.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Landing);
    assert_eq!(sup.vehicle().land_calls, 1);

    // still descending with in-air state
    push(&mut sup, at(997.0, 30.0, 0.2, LandedState::InAir, 105.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::Landing);

    push(&mut sup, at(997.0, 10.0, 0.2, LandedState::Landing, 115.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::ConfirmingTouchdown);

    for s in [120.0, 121.0, 122.0] {
        push(&mut sup, grounded(997.0, s));
        let p = sup.monitor().unwrap();
        assert_eq!(p.phase, Phase::ConfirmingTouchdown);
        assert!(!p.mission_complete);
    }
    push(&mut sup, grounded(997.0, 123.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Complete);
    assert!(p.mission_complete);
    assert_eq!(p.action_required, ActionRequired::MissionCompleteStopCalling);
    assert_eq!(sup.vehicle().land_calls, 1);
    assert!(sup.destination().is_none());
}

#[test]
fn complete_is_idempotent() {
    let mut sup = supervisor();
    let t = fly_to_confirming(&mut sup);
    for i in 1..=4 {
        push(&mut sup, grounded(998.0, t + i as f64));
    }
    let mut last = None;
    for _ in 0..4 {
        last = Some(sup.monitor().unwrap());
    }
    let done = last.unwrap();
    assert!(done.mission_complete);

    let reads = sup.vehicle().reads;
    let lands = sup.vehicle().land_calls;
    for _ in 0..5 {
        assert_eq!(sup.monitor().unwrap(), done);
    }
    assert_eq!(sup.vehicle().reads, reads);
    assert_eq!(sup.vehicle().land_calls, lands);
}

#[test]
fn land_gate_blocks_then_force_accepts() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();

    push(&mut sup, flying(300.0, 30.0));
    match sup.land(false) {
        Err(NavError::LandingBlocked { distance_m, threshold_m }) => {
            assert!((distance_m - 700.0).abs() < 1.0);
            assert_eq!(threshold_m, 10.0);
        }
        other => panic!("expected LandingBlocked, got {:?}", other),
    }
    assert_eq!(sup.vehicle().land_calls, 0);
    assert_eq!(sup.phase(), Some(Phase::Navigating));

    let reply = sup.land(true).unwrap();
    assert!(reply.accepted && reply.forced && reply.command_issued);
    assert_eq!(sup.vehicle().land_calls, 1);
    assert_eq!(sup.phase(), Some(Phase::Landing));

    // guard: no second command for the same arrival
    let again = sup.land(true).unwrap();
    assert!(again.accepted);
    assert!(!again.command_issued);
    assert_eq!(sup.vehicle().land_calls, 1);
}

#[test]
fn land_without_destination_is_allowed() {
    let mut sup = supervisor();
    let reply = sup.land(false).unwrap();
    assert!(reply.accepted && reply.command_issued);
    assert_eq!(sup.vehicle().land_calls, 1);
    assert_eq!(sup.vehicle().reads, 0);
}

#[test]
fn single_stable_sample_then_bounce_does_not_complete() {
    let mut sup = supervisor();
    let t = fly_to_confirming(&mut sup);

    push(&mut sup, grounded(998.0, t + 1.0));
    sup.monitor().unwrap();
    push(&mut sup, at(998.0, 2.5, 0.1, LandedState::InAir, t + 2.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.stable_samples, 0);
    for s in [t + 3.0, t + 4.0, t + 5.0] {
        push(&mut sup, grounded(998.0, s));
        let p = sup.monitor().unwrap();
        assert_eq!(p.phase, Phase::ConfirmingTouchdown);
    }
    push(&mut sup, grounded(998.0, t + 6.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::Complete);
}

#[test]
fn second_navigate_replaces_first() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();

    push(&mut sup, flying(0.0, 1.0));
    let (lat, lon) = offset_m(ORIGIN.0, ORIGIN.1, -200.0, 0.0);
    let reply = sup
        .navigate(
            NavigateRequest { lat, lon, alt_m: 30.0, arrival_radius_m: Some(5.0), auto_land: None },
            T0 + Duration::seconds(1),
        )
        .unwrap();
    assert!(reply.replaced_previous);
    assert!(reply.display_text.contains("abandoned"));
    assert_eq!(reply.destination.arrival_radius_m, 5.0);
    assert!(reply.auto_land);
    assert_eq!(sup.destination().unwrap().lat, lat);

    push(&mut sup, flying(0.0, 2.0));
    let p = sup.monitor().unwrap();
    assert!((p.distance_m - 200.0).abs() < 1.0, "distance {}", p.distance_m);
    assert_eq!(p.phase, Phase::Navigating);
}

#[test]
fn telemetry_failure_while_confirming_keeps_state() {
    let mut sup = supervisor();
    let t = fly_to_confirming(&mut sup);

    push(&mut sup, grounded(998.0, t + 1.0));
    push(&mut sup, grounded(998.0, t + 2.0));
    sup.monitor().unwrap();
    let before = sup.monitor().unwrap();
    assert_eq!(before.stable_samples, 2);
    let run_before = sup.session().unwrap().stable().clone();

    sup.vehicle_mut().script.push_back(Err("link lost".into()));
    let err = sup.monitor().unwrap_err();
    assert!(matches!(err, NavError::Connection(_)));
    assert_eq!(err.action_required(), ActionRequired::RetryAfterLinkError);
    assert_eq!(sup.phase(), Some(Phase::ConfirmingTouchdown));
    assert_eq!(sup.session().unwrap().stable(), &run_before);

    push(&mut sup, grounded(998.0, t + 3.0));
    assert_eq!(sup.monitor().unwrap().stable_samples, 3);
}

#[test]
fn touchdown_timeout_is_terminal_error() {
    let mut sup = supervisor();
    let t = fly_to_confirming(&mut sup);

    // hovering just above the ground, never settles
    for i in 1..=12 {
        push(&mut sup, at(998.0, 3.0, 0.1, LandedState::Landing, t + 10.0 * i as f64));
    }
    let mut timed_out = None;
    for _ in 0..12 {
        match sup.monitor() {
            Ok(p) => assert_eq!(p.phase, Phase::ConfirmingTouchdown),
            Err(e) => {
                timed_out = Some(e);
                break;
            }
        }
    }
    let err = timed_out.expect("timeout expected");
    assert!(matches!(err, NavError::TouchdownTimeout { .. }));
    assert_eq!(err.action_required(), ActionRequired::ManualInterventionRequired);
    assert_eq!(sup.phase(), Some(Phase::TouchdownTimeout));

    let reads = sup.vehicle().reads;
    assert!(matches!(sup.monitor(), Err(NavError::TouchdownTimeout { .. })));
    assert!(matches!(sup.land(true), Err(NavError::TouchdownTimeout { .. })));
    assert_eq!(sup.vehicle().reads, reads);
    assert_eq!(sup.vehicle().land_calls, 1);
}

#[test]
fn monitor_without_session_is_stale() {
    let mut sup = supervisor();
    assert_eq!(sup.monitor().unwrap_err(), NavError::StaleSession);

    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();
    let c = sup.cancel();
    assert!(c.cancelled);
    assert_eq!(sup.monitor().unwrap_err(), NavError::StaleSession);
}

#[test]
fn manual_land_when_auto_land_off() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, false), T0).unwrap();

    push(&mut sup, flying(996.0, 100.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Arrived);
    assert_eq!(p.action_required, ActionRequired::CallLand);

    push(&mut sup, flying(997.0, 101.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Arrived);
    assert_eq!(sup.vehicle().land_calls, 0);

    push(&mut sup, flying(997.0, 102.0));
    let reply = sup.land(false).unwrap();
    assert!(reply.command_issued);
    assert_eq!(sup.phase(), Some(Phase::Landing));
}

#[test]
fn failed_auto_land_command_is_retried_on_next_poll() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();
    push(&mut sup, flying(995.0, 100.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::Arrived);

    sup.vehicle_mut().fail_next_land = true;
    push(&mut sup, flying(996.0, 101.0));
    assert!(matches!(sup.monitor(), Err(NavError::Connection(_))));
    assert_eq!(sup.phase(), Some(Phase::Arrived));
    assert!(!sup.session().unwrap().land_command_sent());

    push(&mut sup, flying(996.0, 102.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::Landing);
    assert_eq!(sup.vehicle().land_calls, 1);
}

#[test]
fn invalid_navigate_leaves_prior_session() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();
    let before = sup.destination().cloned();

    let err = sup
        .navigate(
            NavigateRequest { lat: 91.0, lon: 8.0, alt_m: 10.0, arrival_radius_m: None, auto_land: None },
            T0,
        )
        .unwrap_err();
    assert!(matches!(err, NavError::Validation(_)));
    assert_eq!(sup.destination().cloned(), before);
    assert_eq!(sup.vehicle().gotos.len(), 1);
}

#[test]
fn baseline_deferred_when_first_read_fails() {
    let mut sup = supervisor();
    sup.vehicle_mut().script.push_back(Err("no position yet".into()));
    let reply = sup.navigate(request_north(1000.0, true), T0).unwrap();
    assert_eq!(reply.distance_m, None);
    assert_eq!(sup.destination().unwrap().arrival_radius_m, 10.0);

    push(&mut sup, flying(0.0, 1.0));
    assert_eq!(sup.monitor().unwrap().progress_pct, 0.0);
    push(&mut sup, flying(250.0, 26.0));
    let p = sup.monitor().unwrap();
    assert!((p.progress_pct - 25.0).abs() < 0.5);
}

#[test]
fn arrival_poll_reports_arrived_and_defers_land() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(100.0, true), T0).unwrap();

    push(&mut sup, at(96.0, 50.0, 0.5, LandedState::InAir, 10.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Arrived);
    assert_eq!(p.action_required, ActionRequired::CallMonitorAgain);
    assert!(p.display_text.contains("landing starts on the next monitor call"), "{}", p.display_text);
    assert_eq!(sup.vehicle().land_calls, 0);

    push(&mut sup, at(97.0, 50.0, 0.3, LandedState::InAir, 11.0));
    assert_eq!(sup.monitor().unwrap().phase, Phase::Landing);
    assert_eq!(sup.vehicle().land_calls, 1);
}

#[test]
fn refused_goto_keeps_previous_destination() {
    let mut sup = supervisor();
    push(&mut sup, flying(0.0, 0.0));
    sup.navigate(request_north(1000.0, true), T0).unwrap();

    sup.vehicle_mut().fail_next_goto = true;
    let err = sup.navigate(request_north(300.0, true), T0).unwrap_err();
    assert!(matches!(err, NavError::Connection(_)), "{:?}", err);
    assert_eq!(err.action_required(), ActionRequired::RetryAfterLinkError);
    assert_eq!(sup.vehicle().gotos.len(), 1);

    // still tracking the first target
    push(&mut sup, flying(300.0, 30.0));
    let p = sup.monitor().unwrap();
    assert_eq!(p.phase, Phase::Navigating);
    assert!((p.distance_m - 700.0).abs() < 1.0);
}
