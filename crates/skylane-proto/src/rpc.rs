//! Line-delimited JSON envelope for the tool server.

use serde::{Deserialize, Serialize};

use crate::payload::{ActionRequired, LandReply, MonitorPayload, NavigateReply};
use crate::telemetry::VehicleStatus;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Navigate {
        lat: f64,
        lon: f64,
        altitude: f32,
        arrival_radius_m: Option<f64>,
        auto_land: Option<bool>,
    },
    Monitor,
    Land {
        #[serde(default)]
        force: bool,
    },
    Cancel,
    Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelReply {
    pub cancelled: bool,
    pub display_text: String,
    pub action_required: ActionRequired,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Navigate(NavigateReply),
    Monitor(MonitorPayload),
    Land(LandReply),
    Cancel(CancelReply),
    Status(VehicleStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub display_text: String,
    pub action_required: ActionRequired,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Reply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn ok(result: Reply) -> Self {
        Self { ok: true, result: Some(result), error: None }
    }

    pub fn err(error: ErrorBody) -> Self {
        Self { ok: false, result: None, error: Some(error) }
    }
}
