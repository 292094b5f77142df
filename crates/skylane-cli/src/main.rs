use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use skylane_fc::mav::FcLink;
use skylane_fc::FcConfig;
use skylane_nav::{doctor as nav_doctor, FlightSupervisor, SupervisorConfig};
use skylane_proto::VehicleApi;

use std::time::Duration;

mod serve;
mod sim;

use sim::{SimConfig, SimVehicle};

#[derive(Debug, Parser)]
#[command(name = "skylane", version, about = "Skylane - supervised point-to-point navigation over MAVLink")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Doctor,
    /// Tool server: JSON requests on stdin, JSON responses on stdout.
    Serve {
        /// Drive a simulated vehicle instead of the configured FC link.
        #[arg(long)]
        sim: bool,
    },
    Fc { #[command(subcommand)] cmd: FcCmd },
}

#[derive(Debug, Subcommand)]
enum FcCmd {
    /// Connect once, wait for a heartbeat and print one telemetry sample.
    Status,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    #[serde(default)]
    supervisor: SupervisorConfig,
    fc: Option<FcConfig>,
    #[serde(default)]
    sim: SimConfig,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the serve protocol, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Serve { sim } => run_serve(cfg, sim).await?,
        Command::Fc { cmd } => fc_cmd(&cfg, cmd)?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    nav_doctor::check_supervisor(&cfg.supervisor)?;
    match &cfg.fc {
        Some(fc) => skylane_fc::doctor::check_link(fc)?,
        None => info!("doctor: no [fc] section, only `serve --sim` is usable"),
    }
    info!("doctor: OK");
    Ok(())
}

/// Config checks that must pass before the supervisor or the FC link is built.
fn preflight(cfg: &Config, sim: bool) -> Result<()> {
    nav_doctor::check_supervisor(&cfg.supervisor)?;
    if !sim {
        let fc = cfg.fc.as_ref().context("no [fc] config section")?;
        skylane_fc::doctor::check_link(fc)?;
    }
    Ok(())
}

fn open_fc(cfg: &Config) -> Result<FcLink> {
    let fc = cfg.fc.as_ref().context("no [fc] config section")?;
    skylane_fc::doctor::check_link(fc)?;
    let mut link = FcLink::open(fc).context("FC open")?;
    info!("waiting for FC heartbeat...");
    link.wait_heartbeat(Duration::from_secs(30))?;
    Ok(link)
}

async fn run_serve(cfg: Config, sim: bool) -> Result<()> {
    info!("serve: starting (sim={})", sim);
    preflight(&cfg, sim)?;
    if sim {
        let v = SimVehicle::new(cfg.sim.clone(), time::OffsetDateTime::now_utc());
        serve::serve(FlightSupervisor::new(v, cfg.supervisor)).await
    } else {
        let link = open_fc(&cfg)?;
        serve::serve(FlightSupervisor::new(link, cfg.supervisor)).await
    }
}

fn fc_cmd(cfg: &Config, cmd: FcCmd) -> Result<()> {
    match cmd {
        FcCmd::Status => {
            let mut link = open_fc(cfg)?;
            let sample = link.read_telemetry()?;
            let st = link.link_status();
            let bat = link.battery_status();
            println!("url={:?} connected={} messages={}", st.url, st.connected, st.messages);
            println!("last_heartbeat_age={:?}", st.hb_age());
            println!("position lat={:.7} lon={:.7} rel_alt={:.1}m", sample.lat, sample.lon, sample.alt_m);
            println!("ground_speed={:.1}m/s climb={:.1}m/s", sample.ground_speed_mps, sample.vertical_speed_mps);
            println!("armed={} landed_state={}", sample.armed, sample.landed_state.as_str());
            println!("battery voltage={:?} current={:?} remaining={:?}", bat.voltage, bat.current, bat.remaining);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Config {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_preflight_rejects_nan_duration() {
        let cfg = parse("[supervisor]\nstable_duration_s = nan\n");
        let err = preflight(&cfg, true).unwrap_err();
        assert!(err.to_string().contains("stable_duration_s"), "{}", err);
    }

    #[test]
    fn test_preflight_needs_fc_section_without_sim() {
        let cfg = parse("");
        assert!(preflight(&cfg, true).is_ok());
        assert!(preflight(&cfg, false).is_err());
    }
}
