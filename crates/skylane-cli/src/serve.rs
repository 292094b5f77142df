//! JSON-lines tool server: one request per stdin line, one response per stdout line.

use anyhow::{Context, Result};
use skylane_nav::{FlightSupervisor, NavError, NavigateRequest};
use skylane_proto::rpc::{Reply, Request, Response};
use skylane_proto::VehicleApi;
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

pub async fn serve<V: VehicleApi>(mut sup: FlightSupervisor<V>) -> Result<()> {
    info!("serve: ready, reading requests from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("read request")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // supervisor calls block on the vehicle link
        let resp = tokio::task::block_in_place(|| handle_line(&mut sup, line));
        let mut s = serde_json::to_string(&resp).context("encode response")?;
        s.push('\n');
        out.write_all(s.as_bytes()).await.context("write response")?;
        out.flush().await.context("flush stdout")?;
    }

    info!("serve: stdin closed, exiting");
    Ok(())
}

pub fn handle_line<V: VehicleApi>(sup: &mut FlightSupervisor<V>, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(req) => handle(sup, req),
        Err(e) => {
            warn!("malformed request: {}", e);
            Response::err(NavError::Validation(format!("malformed request: {}", e)).to_body())
        }
    }
}

pub fn handle<V: VehicleApi>(sup: &mut FlightSupervisor<V>, req: Request) -> Response {
    debug!("request: {:?}", req);
    let res = match req {
        Request::Navigate { lat, lon, altitude, arrival_radius_m, auto_land } => sup
            .navigate(
                NavigateRequest { lat, lon, alt_m: altitude, arrival_radius_m, auto_land },
                OffsetDateTime::now_utc(),
            )
            .map(Reply::Navigate),
        Request::Monitor => sup.monitor().map(Reply::Monitor),
        Request::Land { force } => sup.land(force).map(Reply::Land),
        Request::Cancel => Ok(Reply::Cancel(sup.cancel())),
        Request::Status => Ok(Reply::Status(sup.status())),
    };
    match res {
        Ok(r) => Response::ok(r),
        Err(e) => {
            warn!("{} error: {}", e.kind(), e);
            Response::err(e.to_body())
        }
    }
}
