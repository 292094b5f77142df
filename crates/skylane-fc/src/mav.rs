use anyhow::{Context, Result};
use mavlink::{
    common::{
        MavMessage, HEARTBEAT_DATA, MavAutopilot, MavModeFlag, MavState,
        COMMAND_INT_DATA, COMMAND_LONG_DATA, MavCmd, MavFrame, MavType,
    },
    MavConnection, MavHeader, Message,
};
use skylane_proto::{TelemetrySample, VehicleApi, VehicleStatus};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::safety::{CommandKind, CommandRateLimit};
use crate::state::LinkStatus;
use crate::telemetry::{BatteryStatus, TelemetryCache};
use crate::{FcConfig, LinkProtocol};

/// MAV_DO_REPOSITION_FLAGS_CHANGE_MODE: switch to guided before moving.
const REPOSITION_CHANGE_MODE: f32 = 1.0;

/// Longest single wait on the reader channel, so the companion heartbeat keeps going.
const POLL_SLICE: Duration = Duration::from_millis(100);

type Conn = Arc<Box<dyn MavConnection<MavMessage> + Sync + Send>>;

pub struct FcLink {
    conn: Conn,
    frames: Receiver<(MavHeader, MavMessage)>,
    hdr: MavHeader,
    target_sys: u8,
    target_comp: u8,
    limiter: CommandRateLimit,
    require_heartbeat: bool,
    telemetry_timeout: Duration,
    last_hb_send: Option<Instant>,
    cache: TelemetryCache,
    status: LinkStatus,
}

impl FcLink {
    pub fn open(cfg: &FcConfig) -> Result<Self> {
        let url = cfg.connection_url()?;

        if cfg.protocol() == LinkProtocol::Serial {
            // quick validate device
            let _ = tokio_serial::new(&cfg.address, cfg.baud.unwrap_or(57600))
                .open_native_async()
                .with_context(|| format!("open fc serial device {}", cfg.address))?;
        }

        Self::open_url(&url, cfg)
    }

    /// Like `open`, with an explicit `mavlink::connect` address.
    pub fn open_url(url: &str, cfg: &FcConfig) -> Result<Self> {
        info!("FC: connecting {}", url);
        let conn: Conn = Arc::new(
            mavlink::connect::<MavMessage>(url).with_context(|| format!("mavlink connect {}", url))?,
        );
        let frames = spawn_reader(conn.clone())?;

        let status = LinkStatus { url: Some(url.to_string()), ..LinkStatus::default() };

        Ok(Self {
            conn,
            frames,
            hdr: MavHeader { system_id: cfg.sys_id, component_id: cfg.comp_id, sequence: 0 },
            target_sys: cfg.target_sys,
            target_comp: cfg.target_comp,
            limiter: CommandRateLimit::new(Duration::from_millis(cfg.command_min_interval_ms.unwrap_or(1000))),
            require_heartbeat: cfg.require_heartbeat,
            telemetry_timeout: Duration::from_millis(cfg.telemetry_timeout_ms.unwrap_or(2000)),
            last_hb_send: None,
            cache: TelemetryCache::default(),
            status,
        })
    }

    /// Waits up to `wait` for one message from the reader thread and folds it into the cache.
    /// Ok(None) on timeout or on traffic from another system.
    pub fn poll_once(&mut self, wait: Duration) -> Result<Option<MavMessage>> {
        let (hdr, msg) = match self.frames.recv_timeout(wait) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => return Ok(None),
            Err(RecvTimeoutError::Disconnected) => anyhow::bail!("mavlink reader stopped"),
        };
        if hdr.system_id != self.target_sys {
            return Ok(None);
        }
        let is_heartbeat = matches!(msg, MavMessage::HEARTBEAT(_));
        self.status.on_message(msg.message_name(), is_heartbeat);
        self.cache.update(&msg);
        Ok(Some(msg))
    }

    /// Blocks until the autopilot heartbeat shows up.
    pub fn wait_heartbeat(&mut self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            self.heartbeat_tick()?;
            let left = timeout.saturating_sub(start.elapsed());
            if let Some(MavMessage::HEARTBEAT(_)) = self.poll_once(left.min(POLL_SLICE))? {
                info!("FC: heartbeat after {} ms", start.elapsed().as_millis());
                return Ok(());
            }
        }
        anyhow::bail!("no FC heartbeat within {} ms", timeout.as_millis())
    }

    pub fn battery_status(&self) -> &BatteryStatus {
        self.cache.battery()
    }

    pub fn link_status(&self) -> &LinkStatus {
        &self.status
    }

    pub fn send_heartbeat(&mut self) -> Result<()> {
        let hb = HEARTBEAT_DATA {
            custom_mode: 0,
            mavtype: MavType::MAV_TYPE_ONBOARD_CONTROLLER,
            autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
            base_mode: MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        };
        self.send(MavMessage::HEARTBEAT(hb))
    }

    /// Companion heartbeat at 1 Hz while we are talking to the FC.
    fn heartbeat_tick(&mut self) -> Result<()> {
        let due = self.last_hb_send.map(|t| t.elapsed() >= Duration::from_secs(1)).unwrap_or(true);
        if due {
            self.send_heartbeat()?;
            self.last_hb_send = Some(Instant::now());
        }
        Ok(())
    }

    fn ensure_commandable(&self, what: &str) -> Result<()> {
        if self.require_heartbeat && self.status.last_heartbeat.is_none() {
            anyhow::bail!("refusing {}: no heartbeat seen yet", what);
        }
        Ok(())
    }

    /// A refused command is an error: nothing went out on the link.
    fn check_rate(&mut self, kind: CommandKind, what: &str) -> Result<()> {
        if let Err(wait) = self.limiter.allow(kind) {
            warn!("{} rate-limited", what);
            anyhow::bail!("{} rate-limited, retry in {} ms", what, wait.as_millis());
        }
        Ok(())
    }

    pub fn cmd_land(&mut self) -> Result<()> {
        self.ensure_commandable("LAND")?;
        self.check_rate(CommandKind::Land, "LAND")?;

        // lat/lon 0 means land at the current position
        let cmd = COMMAND_LONG_DATA {
            target_system: self.target_sys,
            target_component: self.target_comp,
            command: MavCmd::MAV_CMD_NAV_LAND,
            confirmation: 0,
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: f32::NAN,
            param5: 0.0,
            param6: 0.0,
            param7: 0.0,
        };
        info!("FC: sending LAND");
        self.send(MavMessage::COMMAND_LONG(cmd))
    }

    /// Go to a global position, altitude relative to home.
    pub fn cmd_reposition(&mut self, lat: f64, lon: f64, alt_m: f32) -> Result<()> {
        self.ensure_commandable("REPOSITION")?;
        self.check_rate(CommandKind::Reposition, "REPOSITION")?;

        let cmd = COMMAND_INT_DATA {
            target_system: self.target_sys,
            target_component: self.target_comp,
            frame: MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT_INT,
            command: MavCmd::MAV_CMD_DO_REPOSITION,
            current: 0,
            autocontinue: 0,
            param1: -1.0, // default ground speed
            param2: REPOSITION_CHANGE_MODE,
            param3: 0.0,
            param4: f32::NAN, // keep yaw
            x: (lat * 1e7).round() as i32,
            y: (lon * 1e7).round() as i32,
            z: alt_m,
        };
        info!("FC: sending REPOSITION lat={:.7} lon={:.7} alt={:.1}m", lat, lon, alt_m);
        self.send(MavMessage::COMMAND_INT(cmd))
    }

    fn send(&mut self, msg: MavMessage) -> Result<()> {
        self.hdr.sequence = self.hdr.sequence.wrapping_add(1);
        self.conn.send(&self.hdr, &msg).context("mavlink send")?;
        Ok(())
    }
}

/// `recv` blocks on every backend, so it runs on its own thread and hands frames over a channel.
/// The thread exits on the first frame after the link is dropped.
// TODO: the serial backend holds its port lock inside recv until a frame arrives, so a send on a
// silent serial link waits for the next frame. Route serial sends through this thread.
fn spawn_reader(conn: Conn) -> Result<Receiver<(MavHeader, MavMessage)>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("fc-reader".into())
        .spawn(move || loop {
            match conn.recv() {
                Ok(frame) => {
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("mavlink recv: {}", e);
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        })
        .context("spawn mavlink reader")?;
    Ok(rx)
}

impl VehicleApi for FcLink {
    /// Drains the link until a position newer than the one we had arrives.
    fn read_telemetry(&mut self) -> Result<TelemetrySample> {
        let start = Instant::now();
        let seq = self.cache.position_seq();
        loop {
            self.heartbeat_tick()?;
            let left = self.telemetry_timeout.saturating_sub(start.elapsed());
            if left.is_zero() {
                anyhow::bail!(
                    "no fresh GLOBAL_POSITION_INT/HEARTBEAT within {} ms",
                    self.telemetry_timeout.as_millis()
                );
            }
            self.poll_once(left.min(POLL_SLICE))?;
            if self.cache.position_seq() > seq {
                if let Some(s) = self.cache.sample(OffsetDateTime::now_utc()) {
                    return Ok(s);
                }
            }
        }
    }

    fn goto_location(&mut self, lat: f64, lon: f64, alt_m: f32) -> Result<()> {
        self.cmd_reposition(lat, lon, alt_m)
    }

    fn land(&mut self) -> Result<()> {
        self.cmd_land()
    }

    fn status(&self) -> VehicleStatus {
        let battery = self.cache.battery();
        VehicleStatus {
            connected: self.status.connected,
            heartbeat_age_ms: self.status.hb_age().map(|d| d.as_millis() as u64),
            armed: self.cache.armed(),
            landed_state: self.cache.landed_state(),
            battery_voltage: battery.voltage,
            battery_remaining: battery.remaining,
            note: self.status.url.clone(),
        }
    }
}
