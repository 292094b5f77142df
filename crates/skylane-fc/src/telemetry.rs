//! Folds the MAVLink stream into the latest known vehicle state.

use mavlink::common::{
    EXTENDED_SYS_STATE_DATA, GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA, MavLandedState, MavMessage,
    MavModeFlag, SYS_STATUS_DATA,
};
use serde::Serialize;
use skylane_proto::{LandedState, TelemetrySample};
use time::OffsetDateTime;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatteryStatus {
    pub voltage: Option<f32>,      // Volts
    pub current: Option<f32>,      // Amps
    pub remaining: Option<u8>,     // Percent 0-100
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    lat: f64,
    lon: f64,
    rel_alt_m: f32,
    ground_speed_mps: f32,
    vertical_speed_mps: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryCache {
    position: Option<Position>,
    position_seq: u64,
    landed_state: Option<LandedState>,
    armed: Option<bool>,
    battery: BatteryStatus,
}

pub fn landed_state_from_mav(s: MavLandedState) -> LandedState {
    match s {
        MavLandedState::MAV_LANDED_STATE_ON_GROUND => LandedState::OnGround,
        MavLandedState::MAV_LANDED_STATE_IN_AIR => LandedState::InAir,
        MavLandedState::MAV_LANDED_STATE_TAKEOFF => LandedState::TakingOff,
        MavLandedState::MAV_LANDED_STATE_LANDING => LandedState::Landing,
        _ => LandedState::Undefined,
    }
}

impl TelemetryCache {
    pub fn update(&mut self, msg: &MavMessage) {
        match msg {
            MavMessage::GLOBAL_POSITION_INT(p) => self.update_position(p),
            MavMessage::EXTENDED_SYS_STATE(s) => self.update_landed(s),
            MavMessage::HEARTBEAT(hb) => self.update_armed(hb),
            MavMessage::SYS_STATUS(status) => self.update_battery(status),
            _ => {}
        }
    }

    fn update_position(&mut self, p: &GLOBAL_POSITION_INT_DATA) {
        // lat/lon in degE7, relative_alt in mm, velocities in cm/s (vz positive down)
        let vx = p.vx as f32 / 100.0;
        let vy = p.vy as f32 / 100.0;
        self.position = Some(Position {
            lat: p.lat as f64 / 1e7,
            lon: p.lon as f64 / 1e7,
            rel_alt_m: p.relative_alt as f32 / 1000.0,
            ground_speed_mps: (vx * vx + vy * vy).sqrt(),
            vertical_speed_mps: -(p.vz as f32) / 100.0,
        });
        self.position_seq += 1;
    }

    fn update_landed(&mut self, s: &EXTENDED_SYS_STATE_DATA) {
        self.landed_state = Some(landed_state_from_mav(s.landed_state));
    }

    fn update_armed(&mut self, hb: &HEARTBEAT_DATA) {
        self.armed = Some(hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED));
    }

    fn update_battery(&mut self, status: &SYS_STATUS_DATA) {
        // voltage_battery is in millivolts, convert to volts
        if status.voltage_battery != u16::MAX {
            self.battery.voltage = Some(status.voltage_battery as f32 / 1000.0);
        }
        // current_battery is in centiamps (0.01A), -1 means invalid
        if status.current_battery != -1 {
            self.battery.current = Some(status.current_battery as f32 / 100.0);
        }
        // battery_remaining is percentage 0-100, -1 means invalid
        if status.battery_remaining >= 0 && status.battery_remaining <= 100 {
            self.battery.remaining = Some(status.battery_remaining as u8);
        }
    }

    /// Bumps on every GLOBAL_POSITION_INT; a read waits for this to move.
    pub fn position_seq(&self) -> u64 {
        self.position_seq
    }

    pub fn landed_state(&self) -> Option<LandedState> {
        self.landed_state
    }

    pub fn armed(&self) -> Option<bool> {
        self.armed
    }

    pub fn battery(&self) -> &BatteryStatus {
        &self.battery
    }

    /// None until both a position and a heartbeat have been seen.
    pub fn sample(&self, ts: OffsetDateTime) -> Option<TelemetrySample> {
        let p = self.position?;
        let armed = self.armed?;
        Some(TelemetrySample {
            lat: p.lat,
            lon: p.lon,
            alt_m: p.rel_alt_m,
            ground_speed_mps: p.ground_speed_mps,
            vertical_speed_mps: p.vertical_speed_mps,
            landed_state: self.landed_state.unwrap_or(LandedState::Undefined),
            armed,
            ts,
        })
    }
}
