//! Configuration management for the room broker
//!
//! Configuration comes either from `ROOMBROKER_*` environment variables or
//! from a TOML file. Both paths end in [`Config::validate`], which is where a
//! missing verification secret or store endpoint becomes a startup failure.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// gRPC listener configuration
    pub server: ServerConfig,

    /// Coordination store configuration
    pub store: StoreConfig,

    /// Bearer credential verification
    pub credential: CredentialConfig,

    /// QoS admission thresholds
    pub qos: QosConfig,

    /// Per-replica identity
    pub instance: InstanceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// gRPC listen address
    pub listen_address: SocketAddr,
}

/// Coordination store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store endpoint (`redis://`, `rediss://` or `memory://`)
    pub url: Option<String>,

    /// Upper bound for a single room write, caller deadlines can only shorten it
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// How many ids to try when create-if-absent reports a conflict
    pub max_create_attempts: u32,
}

/// Credential verification configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Pre-shared HS256 secret
    pub jwt_secret: Option<SecretString>,

    /// Reject credentials without a valid `exp` claim
    pub require_expiry: bool,
}

/// QoS admission thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QosConfig {
    /// Highest admissible latency, inclusive
    pub max_latency_ms: i32,

    /// Lowest admissible bandwidth, inclusive
    pub min_bandwidth_kb: i32,
}

/// Replica identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Discriminator embedded in every room id this replica generates
    pub id: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter
    pub enabled: bool,

    /// Exporter bind address
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([127, 0, 0, 1], 50051)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            request_timeout: Duration::from_secs(5),
            max_create_attempts: 3,
        }
    }
}

impl Default for QosConfig {
    fn default() -> Self {
        Self {
            max_latency_ms: 100,
            min_bandwidth_kb: 1000,
        }
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string()[..8].to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
        }
    }
}

const STORE_SCHEMES: [&str; 3] = ["redis://", "rediss://", "memory://"];

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", name, e)))
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: ROOMBROKER_<KEY>
    /// Example: ROOMBROKER_STORE_URL=redis://127.0.0.1:6379
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("ROOMBROKER_LISTEN_ADDRESS") {
            config.server.listen_address = parse_var("ROOMBROKER_LISTEN_ADDRESS", &addr)?;
        }

        // Store
        if let Some(url) = lookup("ROOMBROKER_STORE_URL") {
            config.store.url = Some(url);
        }
        if let Some(timeout) = lookup("ROOMBROKER_STORE_TIMEOUT") {
            config.store.request_timeout = humantime::parse_duration(&timeout).map_err(|e| {
                ConfigError::InvalidValue(format!("ROOMBROKER_STORE_TIMEOUT: {}", e))
            })?;
        }
        if let Some(attempts) = lookup("ROOMBROKER_STORE_MAX_CREATE_ATTEMPTS") {
            config.store.max_create_attempts =
                parse_var("ROOMBROKER_STORE_MAX_CREATE_ATTEMPTS", &attempts)?;
        }

        // Credentials
        if let Some(secret) = lookup("ROOMBROKER_JWT_SECRET") {
            config.credential.jwt_secret = Some(SecretString::new(secret));
        }
        if let Some(require) = lookup("ROOMBROKER_REQUIRE_EXPIRY") {
            config.credential.require_expiry = parse_var("ROOMBROKER_REQUIRE_EXPIRY", &require)?;
        }

        // QoS
        if let Some(latency) = lookup("ROOMBROKER_QOS_MAX_LATENCY_MS") {
            config.qos.max_latency_ms = parse_var("ROOMBROKER_QOS_MAX_LATENCY_MS", &latency)?;
        }
        if let Some(bandwidth) = lookup("ROOMBROKER_QOS_MIN_BANDWIDTH_KB") {
            config.qos.min_bandwidth_kb = parse_var("ROOMBROKER_QOS_MIN_BANDWIDTH_KB", &bandwidth)?;
        }

        if let Some(id) = lookup("ROOMBROKER_INSTANCE_ID") {
            config.instance.id = id;
        }

        // Logging
        if let Some(level) = lookup("ROOMBROKER_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(json) = lookup("ROOMBROKER_LOG_JSON") {
            config.logging.json_format = parse_var("ROOMBROKER_LOG_JSON", &json)?;
        }

        // Metrics
        if let Some(enabled) = lookup("ROOMBROKER_METRICS_ENABLED") {
            config.metrics.enabled = parse_var("ROOMBROKER_METRICS_ENABLED", &enabled)?;
        }
        if let Some(addr) = lookup("ROOMBROKER_METRICS_BIND_ADDRESS") {
            config.metrics.bind_address = parse_var("ROOMBROKER_METRICS_BIND_ADDRESS", &addr)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.store_url()?;
        if !STORE_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
            return Err(ConfigError::ValidationFailed(format!(
                "unsupported store url: {}",
                url
            )));
        }

        self.jwt_secret()?;

        if self.store.request_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "store request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.store.max_create_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_create_attempts must be greater than 0".to_string(),
            ));
        }

        if self.instance.id.is_empty()
            || !self.instance.id.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::ValidationFailed(format!(
                "instance id must be non-empty and alphanumeric: {:?}",
                self.instance.id
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Configured store endpoint
    pub fn store_url(&self) -> Result<&str, ConfigError> {
        match self.store.url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url),
            _ => Err(ConfigError::MissingValue("store url")),
        }
    }

    /// Configured verification secret
    pub fn jwt_secret(&self) -> Result<&SecretString, ConfigError> {
        match &self.credential.jwt_secret {
            Some(secret) if !secret.expose_secret().is_empty() => Ok(secret),
            _ => Err(ConfigError::MissingValue("jwt secret")),
        }
    }
}
