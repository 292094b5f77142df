pub mod geo;
pub mod config;
pub mod error;
pub mod destination;
pub mod arrival;
pub mod gate;
pub mod touchdown;
pub mod session;
pub mod supervisor;
pub mod doctor;

pub use config::SupervisorConfig;
pub use error::NavError;
pub use destination::{Destination, DestinationRegistry};
pub use supervisor::{FlightSupervisor, NavigateRequest};
