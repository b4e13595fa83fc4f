//! Core of the room broker: credential verification, the distributed room
//! registry, QoS admission and the orchestrating [`BrokerService`].

pub mod broker;
pub mod config;
pub mod credential;
pub mod logging;
pub mod metrics;
pub mod qos;
pub mod registry;

pub use broker::{
    AdmissionPolicy, AuthOutcome, BrokerService, CreateRoomOutcome, IdentityVerifier, QosOutcome,
    RoomRegistrar,
};
pub use config::{Config, ConfigError};
pub use credential::{mint_credential, AuthFailure, CredentialValidator, Identity};
pub use logging::{init_logging, LogLevel};
pub use qos::{Decision, QosPolicy};
pub use registry::{RegistryError, RoomId, RoomIdGenerator, RoomRecord, RoomRegistry};
