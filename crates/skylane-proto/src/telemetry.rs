use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Coarse landed-state classification, mirrors MAV_LANDED_STATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandedState {
    Undefined,
    OnGround,
    TakingOff,
    InAir,
    Landing,
}

impl LandedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LandedState::Undefined => "undefined",
            LandedState::OnGround => "on-ground",
            LandedState::TakingOff => "taking-off",
            LandedState::InAir => "in-air",
            LandedState::Landing => "landing",
        }
    }
}

/// One telemetry read. Built fresh on every read, never cached past one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub lat: f64,
    pub lon: f64,
    /// Height above the takeoff point.
    pub alt_m: f32,
    pub ground_speed_mps: f32,
    /// Positive up.
    pub vertical_speed_mps: f32,
    pub landed_state: LandedState,
    pub armed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// Link health snapshot for the `status` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub connected: bool,
    pub heartbeat_age_ms: Option<u64>,
    pub armed: Option<bool>,
    pub landed_state: Option<LandedState>,
    pub battery_voltage: Option<f32>,
    pub battery_remaining: Option<u8>,
    pub note: Option<String>,
}

/// The vehicle command/telemetry collaborator.
///
/// Every call is synchronous and may block on the link. Errors are transient
/// link failures; callers retry on their own schedule.
pub trait VehicleApi {
    fn read_telemetry(&mut self) -> Result<TelemetrySample>;

    /// Reposition to a global target, altitude relative to takeoff.
    fn goto_location(&mut self, lat: f64, lon: f64, alt_m: f32) -> Result<()>;

    fn land(&mut self) -> Result<()>;

    fn status(&self) -> VehicleStatus {
        VehicleStatus::default()
    }
}
