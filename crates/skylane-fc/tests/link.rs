use std::net::UdpSocket;
use std::time::{Duration, Instant};

use mavlink::common::{
    MavMessage, MavModeFlag, GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA,
};
use mavlink::MavHeader;
use skylane_fc::mav::FcLink;
use skylane_fc::FcConfig;
use skylane_proto::VehicleApi;

const COMMAND_INT_ID: u32 = 75;
const COMMAND_LONG_ID: u32 = 76;

fn free_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

fn cfg(port: u16) -> FcConfig {
    FcConfig {
        protocol: "udp".into(),
        address: "127.0.0.1".into(),
        port: Some(port),
        baud: None,
        sys_id: 245,
        comp_id: 191,
        target_sys: 1,
        target_comp: 1,
        require_heartbeat: false,
        telemetry_timeout_ms: Some(200),
        command_min_interval_ms: Some(10_000),
    }
}

/// A local socket standing in for the FC; `open_url` points a udpout link at it.
fn fake_fc() -> (UdpSocket, String) {
    let fc = UdpSocket::bind("127.0.0.1:0").unwrap();
    fc.set_read_timeout(Some(Duration::from_millis(300))).unwrap();
    let url = format!("udpout:{}", fc.local_addr().unwrap());
    (fc, url)
}

fn next_msg_id(fc: &UdpSocket) -> Option<u32> {
    let mut buf = [0u8; 512];
    let (n, _) = fc.recv_from(&mut buf).ok()?;
    // v2 frame: magic, len, incompat, compat, seq, sysid, compid, msgid[3]
    assert!(n >= 10);
    assert_eq!(buf[0], 0xFD);
    Some(u32::from_le_bytes([buf[7], buf[8], buf[9], 0]))
}

fn frame(msg: &MavMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    let hdr = MavHeader { system_id: 1, component_id: 1, sequence: 0 };
    mavlink::write_v2_msg(&mut buf, hdr, msg).unwrap();
    buf
}

#[test]
fn silent_link_read_fails_within_timeout() {
    let mut link = FcLink::open(&cfg(free_udp_port())).unwrap();
    let start = Instant::now();
    let err = link.read_telemetry().unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(2), "read took {:?}", start.elapsed());
    assert!(err.to_string().contains("200 ms"), "{}", err);
}

#[test]
fn read_returns_sample_from_fc_traffic() {
    let port = free_udp_port();
    let mut link = FcLink::open(&cfg(port)).unwrap();

    let fc = UdpSocket::bind("127.0.0.1:0").unwrap();
    let base_mode = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED | MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED;
    let hb = MavMessage::HEARTBEAT(HEARTBEAT_DATA { base_mode, ..Default::default() });
    let pos = MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
        lat: 473977420,
        lon: 85455940,
        relative_alt: 20_000,
        ..Default::default()
    });
    for msg in [&hb, &pos] {
        fc.send_to(&frame(msg), ("127.0.0.1", port)).unwrap();
    }

    let s = link.read_telemetry().unwrap();
    assert!((s.lat - 47.397742).abs() < 1e-6);
    assert!((s.alt_m - 20.0).abs() < 1e-3);
    assert!(s.armed);
    assert!(link.link_status().last_heartbeat.is_some());
}

#[test]
fn rate_limited_goto_is_an_error_and_sends_nothing() {
    let (fc, url) = fake_fc();
    let mut link = FcLink::open_url(&url, &cfg(0)).unwrap();

    link.goto_location(47.0, 8.0, 30.0).unwrap();
    let err = link.goto_location(47.1, 8.1, 30.0).unwrap_err();
    assert!(err.to_string().contains("REPOSITION rate-limited"), "{}", err);

    assert_eq!(next_msg_id(&fc), Some(COMMAND_INT_ID));
    assert_eq!(next_msg_id(&fc), None);
}

#[test]
fn rate_limited_land_is_an_error() {
    let (fc, url) = fake_fc();
    let mut link = FcLink::open_url(&url, &cfg(0)).unwrap();

    link.land().unwrap();
    assert!(link.land().is_err());
    // a reposition is limited separately
    link.goto_location(47.0, 8.0, 30.0).unwrap();

    assert_eq!(next_msg_id(&fc), Some(COMMAND_LONG_ID));
    assert_eq!(next_msg_id(&fc), Some(COMMAND_INT_ID));
    assert_eq!(next_msg_id(&fc), None);
}
