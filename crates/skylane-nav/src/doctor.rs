use anyhow::Result;
use crate::config::SupervisorConfig;

pub fn check_supervisor(cfg: &SupervisorConfig) -> Result<()> {
    anyhow::ensure!(cfg.default_arrival_radius_m > 0.5 && cfg.default_arrival_radius_m <= 500.0, "supervisor.default_arrival_radius_m should be 0.5..500");
    anyhow::ensure!(cfg.eta_min_speed_mps > 0.0 && cfg.eta_min_speed_mps.is_finite(), "supervisor.eta_min_speed_mps must be > 0");
    anyhow::ensure!(cfg.ground_altitude_m > 0.0 && cfg.ground_altitude_m <= 10.0, "supervisor.ground_altitude_m should be 0..10");
    anyhow::ensure!(cfg.ground_speed_mps > 0.0 && cfg.ground_speed_mps <= 3.0, "supervisor.ground_speed_mps should be 0..3");
    anyhow::ensure!(cfg.min_stable_samples >= 2, "supervisor.min_stable_samples must be >= 2");
    anyhow::ensure!(cfg.stable_duration_s >= 1.0 && cfg.stable_duration_s <= 60.0, "supervisor.stable_duration_s should be 1..60");
    anyhow::ensure!(cfg.touchdown_timeout_s > cfg.stable_duration_s, "supervisor.touchdown_timeout_s must exceed stable_duration_s");
    anyhow::ensure!(cfg.touchdown_timeout_s <= 3600.0, "supervisor.touchdown_timeout_s should be <= 3600");
    Ok(())
}
