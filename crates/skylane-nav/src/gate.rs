use tracing::warn;

use crate::destination::Destination;
use crate::error::NavError;
use crate::session::FlightSession;

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Allow,
    Deny { distance_m: f64, threshold_m: f64, reason: String },
}

/// Blocks landing away from the registered destination unless forced.
#[derive(Debug, Clone, Default)]
pub struct LandingGate;

impl LandingGate {
    /// `distance_m` is only called when a destination is active and the
    /// landing is not forced; its errors propagate unchanged.
    pub fn authorize_land<F>(
        &self,
        session: Option<&FlightSession>,
        force: bool,
        distance_m: F,
    ) -> Result<GateDecision, NavError>
    where
        F: FnOnce(&Destination) -> Result<f64, NavError>,
    {
        let Some(session) = session else { return Ok(GateDecision::Allow); };
        if force {
            return Ok(GateDecision::Allow);
        }
        let dest = &session.destination;
        let d = distance_m(dest)?;
        if d <= dest.arrival_radius_m {
            return Ok(GateDecision::Allow);
        }
        let reason = format!(
            "vehicle is {:.1} m from destination, arrival radius is {:.1} m",
            d, dest.arrival_radius_m
        );
        warn!("land denied: {}", reason);
        Ok(GateDecision::Deny { distance_m: d, threshold_m: dest.arrival_radius_m, reason })
    }
}
