pub mod telemetry;
pub mod payload;
pub mod rpc;

pub use telemetry::{LandedState, TelemetrySample, VehicleApi, VehicleStatus};
pub use payload::{ActionRequired, DestinationInfo, LandReply, MonitorPayload, NavigateReply, Phase};
