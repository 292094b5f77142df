//! Kinematic stand-in for a real vehicle, for dry runs of the tool server.

use anyhow::Result;
use serde::Deserialize;
use skylane_nav::geo::{haversine_m, offset_m, EARTH_MEAN_RADIUS_M};
use skylane_proto::{LandedState, TelemetrySample, VehicleApi, VehicleStatus};
use time::OffsetDateTime;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub home_lat: f64,
    pub home_lon: f64,
    pub start_alt_m: f32,
    pub cruise_speed_mps: f32,
    pub vertical_speed_mps: f32,
    pub disarm_delay_s: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            home_lat: 47.397742,
            home_lon: 8.545594,
            start_alt_m: 20.0,
            cruise_speed_mps: 10.0,
            vertical_speed_mps: 1.5,
            disarm_delay_s: 2.0,
        }
    }
}

pub struct SimVehicle {
    cfg: SimConfig,
    lat: f64,
    lon: f64,
    alt_m: f32,
    ground_speed_mps: f32,
    vertical_speed_mps: f32,
    target: Option<(f64, f64, f32)>,
    landing: bool,
    armed: bool,
    landed_state: LandedState,
    touchdown_at: Option<OffsetDateTime>,
    last_step: OffsetDateTime,
}

impl SimVehicle {
    pub fn new(cfg: SimConfig, now: OffsetDateTime) -> Self {
        Self {
            lat: cfg.home_lat,
            lon: cfg.home_lon,
            alt_m: cfg.start_alt_m,
            ground_speed_mps: 0.0,
            vertical_speed_mps: 0.0,
            target: None,
            landing: false,
            armed: true,
            landed_state: LandedState::InAir,
            touchdown_at: None,
            last_step: now,
            cfg,
        }
    }

    pub fn advance_to(&mut self, now: OffsetDateTime) {
        let dt = (now - self.last_step).as_seconds_f64().max(0.0);
        self.last_step = now;
        if dt == 0.0 {
            return;
        }

        if self.landing {
            self.ground_speed_mps = 0.0;
            if self.alt_m > 0.0 {
                self.vertical_speed_mps = -self.cfg.vertical_speed_mps;
                self.alt_m = (self.alt_m - self.cfg.vertical_speed_mps * dt as f32).max(0.0);
                self.landed_state = LandedState::Landing;
            }
            if self.alt_m <= 0.0 {
                self.vertical_speed_mps = 0.0;
                self.landed_state = LandedState::OnGround;
                let since = *self.touchdown_at.get_or_insert(now);
                if self.armed && (now - since).as_seconds_f64() >= self.cfg.disarm_delay_s {
                    info!("sim: auto-disarm after touchdown");
                    self.armed = false;
                }
            }
            return;
        }

        let Some((tlat, tlon, talt)) = self.target else {
            self.ground_speed_mps = 0.0;
            self.vertical_speed_mps = 0.0;
            return;
        };

        let dist = haversine_m(self.lat, self.lon, tlat, tlon);
        let step = (self.cfg.cruise_speed_mps as f64 * dt).min(dist);
        if dist > 0.0 {
            let north = (tlat - self.lat).to_radians() * EARTH_MEAN_RADIUS_M;
            let east = (tlon - self.lon).to_radians() * EARTH_MEAN_RADIUS_M * self.lat.to_radians().cos();
            let f = step / dist;
            let (lat, lon) = offset_m(self.lat, self.lon, north * f, east * f);
            self.lat = lat;
            self.lon = lon;
        }
        self.ground_speed_mps = (step / dt) as f32;

        let dz = talt - self.alt_m;
        let max_dz = self.cfg.vertical_speed_mps * dt as f32;
        let climb = dz.clamp(-max_dz, max_dz);
        self.alt_m += climb;
        self.vertical_speed_mps = climb / dt as f32;
        self.landed_state = LandedState::InAir;
    }

    pub fn sample(&self) -> TelemetrySample {
        TelemetrySample {
            lat: self.lat,
            lon: self.lon,
            alt_m: self.alt_m,
            ground_speed_mps: self.ground_speed_mps,
            vertical_speed_mps: self.vertical_speed_mps,
            landed_state: self.landed_state,
            armed: self.armed,
            ts: self.last_step,
        }
    }
}

impl VehicleApi for SimVehicle {
    fn read_telemetry(&mut self) -> Result<TelemetrySample> {
        self.advance_to(OffsetDateTime::now_utc());
        Ok(self.sample())
    }

    fn goto_location(&mut self, lat: f64, lon: f64, alt_m: f32) -> Result<()> {
        anyhow::ensure!(self.armed, "sim: vehicle is disarmed");
        self.advance_to(OffsetDateTime::now_utc());
        info!("sim: goto lat={:.7} lon={:.7} alt={:.1}m", lat, lon, alt_m);
        self.target = Some((lat, lon, alt_m));
        self.landing = false;
        Ok(())
    }

    fn land(&mut self) -> Result<()> {
        self.advance_to(OffsetDateTime::now_utc());
        info!("sim: land");
        self.landing = true;
        self.target = None;
        Ok(())
    }

    fn status(&self) -> VehicleStatus {
        VehicleStatus {
            connected: true,
            heartbeat_age_ms: Some(0),
            armed: Some(self.armed),
            landed_state: Some(self.landed_state),
            battery_voltage: None,
            battery_remaining: None,
            note: Some("simulated vehicle".to_string()),
        }
    }
}
