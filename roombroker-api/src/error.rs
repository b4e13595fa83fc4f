use roombroker_core::config::ConfigError;
use roombroker_core::logging::LoggingError;
use roombroker_core::registry::StoreError;
use thiserror::Error;

/// Failures that stop the server before (or instead of) serving
///
/// Per-request outcomes never become errors; they travel in the response
/// messages.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Store connection failed: {0}")]
    Store(#[from] StoreError),

    #[error("Metrics exporter failed: {0}")]
    Metrics(String),

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
