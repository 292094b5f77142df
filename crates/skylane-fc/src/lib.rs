pub mod doctor;
pub mod mav;
pub mod safety;
pub mod state;
pub mod telemetry;

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct FcConfig {
    /// udp | tcp | serial. Anything else falls back to udp.
    pub protocol: String,

    /// Host for udp/tcp (udp listens on it), device path for serial.
    pub address: String,

    /// udp/tcp port. Default 14540.
    pub port: Option<u16>,

    /// Serial baud rate. Default 57600.
    pub baud: Option<u32>,

    /// MAVLink ids we use (companion side)
    pub sys_id: u8,
    pub comp_id: u8,

    /// target system/component (FC side). 1/1 is common for ArduPilot.
    pub target_sys: u8,
    pub target_comp: u8,

    /// Require seeing FC heartbeat before sending commands
    pub require_heartbeat: bool,

    /// How long one telemetry read waits for a fresh position. Default 2000.
    pub telemetry_timeout_ms: Option<u64>,

    /// Minimum spacing between two commands of the same kind. Default 1000.
    pub command_min_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProtocol {
    Udp,
    Tcp,
    Serial,
}

impl FcConfig {
    pub fn protocol(&self) -> LinkProtocol {
        match self.protocol.to_ascii_lowercase().as_str() {
            "udp" => LinkProtocol::Udp,
            "tcp" => LinkProtocol::Tcp,
            "serial" => LinkProtocol::Serial,
            other => {
                warn!("invalid fc.protocol '{}', defaulting to udp", other);
                LinkProtocol::Udp
            }
        }
    }

    /// Connection string in the form `mavlink::connect` expects.
    pub fn connection_url(&self) -> Result<String> {
        anyhow::ensure!(!self.address.is_empty(), "fc.address not configured");
        let port = self.port.unwrap_or(14540);
        Ok(match self.protocol() {
            LinkProtocol::Udp => format!("udpin:{}:{}", self.address, port),
            LinkProtocol::Tcp => format!("tcpout:{}:{}", self.address, port),
            LinkProtocol::Serial => format!("serial:{}:{}", self.address, self.baud.unwrap_or(57600)),
        })
    }
}
