//! gRPC front end of the room broker

pub mod deadline;
pub mod error;
pub mod proto;
pub mod server;
pub mod service;

pub use error::StartupError;
pub use server::{broker_over, build_broker, run, serve};
pub use service::RoomBrokerService;
