use skylane_proto::DestinationInfo;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::NavError;
use crate::session::FlightSession;

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub lat: f64,
    pub lon: f64,
    /// Height above takeoff.
    pub alt_m: f32,
    pub arrival_radius_m: f64,
    pub registered_at: OffsetDateTime,
}

impl Destination {
    pub fn new(
        lat: f64,
        lon: f64,
        alt_m: f32,
        arrival_radius_m: f64,
        registered_at: OffsetDateTime,
    ) -> Result<Self, NavError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(NavError::Validation(format!("latitude {} must be between -90 and 90", lat)));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(NavError::Validation(format!("longitude {} must be between -180 and 180", lon)));
        }
        if !alt_m.is_finite() || alt_m < 0.0 {
            return Err(NavError::Validation(format!("altitude {} m must be >= 0", alt_m)));
        }
        if !arrival_radius_m.is_finite() || arrival_radius_m <= 0.0 {
            return Err(NavError::Validation(format!(
                "arrival radius {} m must be a positive distance",
                arrival_radius_m
            )));
        }
        Ok(Self { lat, lon, alt_m, arrival_radius_m, registered_at })
    }

    pub fn info(&self) -> DestinationInfo {
        DestinationInfo {
            lat: self.lat,
            lon: self.lon,
            alt_m: self.alt_m,
            arrival_radius_m: self.arrival_radius_m,
        }
    }
}

/// Holds the single active destination and the session flying to it.
/// All access to the session goes through here so there is never more than one.
#[derive(Debug, Default)]
pub struct DestinationRegistry {
    active: Option<FlightSession>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new session for `session.destination`, returning the one it replaced.
    pub fn register(&mut self, session: FlightSession) -> Option<FlightSession> {
        let d = &session.destination;
        info!(
            "destination registered: lat={:.7} lon={:.7} alt={:.1}m radius={:.1}m",
            d.lat, d.lon, d.alt_m, d.arrival_radius_m
        );
        let prev = self.active.replace(session);
        if let Some(p) = &prev {
            warn!(
                "abandoning active navigation in phase {} (lat={:.7} lon={:.7}) for new destination",
                p.phase().as_str(),
                p.destination.lat,
                p.destination.lon
            );
        }
        prev
    }

    pub fn current(&self) -> Option<&Destination> {
        self.active.as_ref().map(|s| &s.destination)
    }

    pub fn session(&self) -> Option<&FlightSession> {
        self.active.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut FlightSession> {
        self.active.as_mut()
    }

    pub fn clear(&mut self) -> Option<FlightSession> {
        self.active.take()
    }
}
