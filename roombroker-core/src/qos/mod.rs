//! QoS admission control

use crate::config::QosConfig;

/// Reason attached to every rejected proposal
pub const OUT_OF_POLICY: &str = "QoS parameters out of policy";

/// Outcome of evaluating a QoS proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub accepted: bool,
    pub reason: Option<String>,
}

impl Decision {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
        }
    }
}

/// Fixed-threshold admission policy
///
/// Accepts iff `latency_ms <= max_latency_ms` and
/// `bandwidth_kb >= min_bandwidth_kb`. Which bound failed is not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosPolicy {
    pub max_latency_ms: i32,
    pub min_bandwidth_kb: i32,
}

impl Default for QosPolicy {
    fn default() -> Self {
        Self {
            max_latency_ms: 100,
            min_bandwidth_kb: 1000,
        }
    }
}

impl From<&QosConfig> for QosPolicy {
    fn from(config: &QosConfig) -> Self {
        Self {
            max_latency_ms: config.max_latency_ms,
            min_bandwidth_kb: config.min_bandwidth_kb,
        }
    }
}

impl QosPolicy {
    pub fn evaluate(&self, bandwidth_kb: i32, latency_ms: i32) -> Decision {
        if latency_ms <= self.max_latency_ms && bandwidth_kb >= self.min_bandwidth_kb {
            Decision::accept()
        } else {
            Decision::reject(OUT_OF_POLICY)
        }
    }
}
