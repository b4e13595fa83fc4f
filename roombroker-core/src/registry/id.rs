//! Fleet-unique room identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a registered room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates `<unix millis hex>-<instance>-<random 64 bit hex>` ids
///
/// The instance part separates replicas, the random part separates calls
/// racing inside one replica. Nothing is counted locally.
#[derive(Debug, Clone)]
pub struct RoomIdGenerator {
    instance: String,
}

impl RoomIdGenerator {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn next_id(&self) -> RoomId {
        let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        let suffix: u64 = rand::random();
        RoomId(format!("{:011x}-{}-{:016x}", millis, self.instance, suffix))
    }
}
