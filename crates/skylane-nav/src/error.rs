use skylane_proto::rpc::ErrorBody;
use skylane_proto::ActionRequired;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    /// Bad destination input, rejected before any state change.
    #[error("invalid destination: {0}")]
    Validation(String),

    #[error("landing blocked: {distance_m:.1} m from destination exceeds arrival radius {threshold_m:.1} m")]
    LandingBlocked { distance_m: f64, threshold_m: f64 },

    #[error("no active navigation session to report")]
    StaleSession,

    /// Transient telemetry or command failure. Session state is untouched.
    #[error("vehicle link error: {0}")]
    Connection(String),

    #[error("touchdown not confirmed within {elapsed_s:.0} s of landing")]
    TouchdownTimeout { elapsed_s: f64 },
}

impl NavError {
    pub(crate) fn link(what: &str, e: anyhow::Error) -> Self {
        NavError::Connection(format!("{}: {:#}", what, e))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NavError::Validation(_) => "validation",
            NavError::LandingBlocked { .. } => "landing_blocked",
            NavError::StaleSession => "stale_session",
            NavError::Connection(_) => "connection",
            NavError::TouchdownTimeout { .. } => "touchdown_timeout",
        }
    }

    pub fn action_required(&self) -> ActionRequired {
        match self {
            NavError::Validation(_) => ActionRequired::FixInputAndRetry,
            NavError::LandingBlocked { .. } => ActionRequired::ForceLandOrContinueMonitoring,
            NavError::StaleSession => ActionRequired::CallNavigate,
            NavError::Connection(_) => ActionRequired::RetryAfterLinkError,
            NavError::TouchdownTimeout { .. } => ActionRequired::ManualInterventionRequired,
        }
    }

    /// Sentence the caller can show verbatim.
    pub fn display_text(&self) -> String {
        match self {
            NavError::Validation(msg) => format!("REJECTED: {}. Nothing was changed.", msg),
            NavError::LandingBlocked { distance_m, threshold_m } => format!(
                "LANDING BLOCKED: vehicle is {:.1} m from the destination, landing is allowed within {:.1} m. Keep monitoring or force the landing.",
                distance_m, threshold_m
            ),
            NavError::StaleSession => {
                "NO ACTIVE NAVIGATION: there is nothing to monitor. Call navigate first.".to_string()
            }
            NavError::Connection(msg) => format!(
                "LINK ERROR: {}. Flight state was not changed, retry the same call.",
                msg
            ),
            NavError::TouchdownTimeout { elapsed_s } => format!(
                "TOUCHDOWN NOT CONFIRMED: landing started {:.0} s ago but the vehicle never settled on the ground. Manual intervention required.",
                elapsed_s
            ),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind().to_string(),
            message: self.to_string(),
            display_text: self.display_text(),
            action_required: self.action_required(),
        }
    }
}
