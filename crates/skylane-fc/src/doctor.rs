use anyhow::Result;
use crate::FcConfig;

pub fn check_link(cfg: &FcConfig) -> Result<()> {
    cfg.connection_url()?;
    anyhow::ensure!(cfg.sys_id != cfg.target_sys, "fc.sys_id must differ from fc.target_sys");
    anyhow::ensure!(cfg.telemetry_timeout_ms.unwrap_or(2000) >= 100, "fc.telemetry_timeout_ms too small");
    anyhow::ensure!(cfg.command_min_interval_ms.unwrap_or(1000) <= 10_000, "fc.command_min_interval_ms should be <= 10000");
    Ok(())
}
