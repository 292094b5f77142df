use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Navigating,
    Arrived,
    Landing,
    ConfirmingTouchdown,
    Complete,
    TouchdownTimeout,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::TouchdownTimeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Navigating => "NAVIGATING",
            Phase::Arrived => "ARRIVED",
            Phase::Landing => "LANDING",
            Phase::ConfirmingTouchdown => "CONFIRMING_TOUCHDOWN",
            Phase::Complete => "COMPLETE",
            Phase::TouchdownTimeout => "TOUCHDOWN_TIMEOUT",
        }
    }
}

/// What the caller must do next. The caller keeps no state between calls,
/// so every reply carries one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionRequired {
    CallMonitorAgain,
    CallLand,
    MissionCompleteStopCalling,
    ForceLandOrContinueMonitoring,
    RetryAfterLinkError,
    ManualInterventionRequired,
    CallNavigate,
    FixInputAndRetry,
}

impl ActionRequired {
    pub fn instruction(&self) -> &'static str {
        match self {
            ActionRequired::CallMonitorAgain => "call monitor again",
            ActionRequired::CallLand => "call land to start the descent",
            ActionRequired::MissionCompleteStopCalling => "mission complete, stop calling monitor",
            ActionRequired::ForceLandOrContinueMonitoring => {
                "landing blocked, keep calling monitor or call land with force=true"
            }
            ActionRequired::RetryAfterLinkError => "vehicle link error, retry the same call",
            ActionRequired::ManualInterventionRequired => {
                "touchdown not confirmed, manual intervention required"
            }
            ActionRequired::CallNavigate => "no active navigation, call navigate first",
            ActionRequired::FixInputAndRetry => "fix the request parameters and retry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationInfo {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f32,
    pub arrival_radius_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorPayload {
    pub phase: Phase,
    pub distance_m: f64,
    pub altitude_m: f32,
    pub speed_mps: f32,
    /// `None` while the vehicle is too slow to give a meaningful estimate.
    pub eta_s: Option<f64>,
    pub progress_pct: f64,
    pub elapsed_s: f64,
    pub stable_samples: u32,
    pub display_text: String,
    pub action_required: ActionRequired,
    pub mission_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigateReply {
    pub registered: bool,
    pub destination: DestinationInfo,
    pub auto_land: bool,
    pub replaced_previous: bool,
    pub distance_m: Option<f64>,
    pub display_text: String,
    pub action_required: ActionRequired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandReply {
    pub accepted: bool,
    pub forced: bool,
    /// False when a land command for this arrival was already sent.
    pub command_issued: bool,
    pub display_text: String,
    pub action_required: ActionRequired,
}
