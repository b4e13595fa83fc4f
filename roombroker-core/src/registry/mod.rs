//! Distributed room registry
//!
//! Rooms are written once under `rooms/<id>` with a create-if-absent write
//! and are never updated or removed by the broker.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::metrics::Timer;

mod id;
pub mod store;

pub use id::{RoomId, RoomIdGenerator};
pub use store::{CoordinationStore, StoreError};

/// Key namespace for room records
pub const ROOM_KEY_PREFIX: &str = "rooms/";

/// Persisted room record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store write timed out after {}; outcome unknown", display_duration(.0))]
    DeadlineExceeded(Duration),

    #[error("no free room id after {attempts} attempts")]
    IdsExhausted { attempts: u32 },

    #[error("room record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

fn display_duration(duration: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*duration)
}

impl RegistryError {
    /// Whether the failure may clear up on its own
    ///
    /// A transient failure can still mean the room was written.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::DeadlineExceeded(_) | RegistryError::Store(StoreError::Unavailable(_))
        )
    }
}

pub fn record_key(id: &RoomId) -> String {
    format!("{}{}", ROOM_KEY_PREFIX, id)
}

/// Registers rooms in the coordination store
pub struct RoomRegistry {
    store: Arc<dyn CoordinationStore>,
    ids: RoomIdGenerator,
    write_timeout: Duration,
    max_attempts: u32,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn CoordinationStore>, ids: RoomIdGenerator) -> Self {
        Self {
            store,
            ids,
            write_timeout: Duration::from_secs(5),
            max_attempts: 3,
        }
    }

    pub fn from_config(store: Arc<dyn CoordinationStore>, config: &Config) -> Self {
        Self::new(store, RoomIdGenerator::new(config.instance.id.clone()))
            .with_write_timeout(config.store.request_timeout)
            .with_max_attempts(config.store.max_create_attempts)
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Register a new room and return its id
    ///
    /// `deadline` can only shorten the configured write timeout. Store
    /// failures and timeouts are returned as-is and never retried; only a
    /// conflict on the generated id leads to another attempt.
    pub async fn create_room(
        &self,
        owner_id: &str,
        name: &str,
        deadline: Option<Duration>,
    ) -> Result<RoomId, RegistryError> {
        let budget = deadline.map_or(self.write_timeout, |d| d.min(self.write_timeout));

        let timer = Timer::new("registry.create.duration_ms");
        let result = match tokio::time::timeout(budget, self.write_new_room(owner_id, name)).await
        {
            Ok(result) => result,
            Err(_) => Err(RegistryError::DeadlineExceeded(budget)),
        };
        timer.stop();

        if let Err(e) = &result {
            warn!(owner_id, error = %e, transient = e.is_transient(), "room registration failed");
        }
        result
    }

    async fn write_new_room(&self, owner_id: &str, name: &str) -> Result<RoomId, RegistryError> {
        for attempt in 1..=self.max_attempts {
            let id = self.ids.next_id();
            let record = RoomRecord {
                id: id.to_string(),
                name: name.to_string(),
                owner_id: owner_id.to_string(),
            };
            let value = serde_json::to_string(&record)?;

            if self.store.put_if_absent(&record_key(&id), &value).await? {
                info!(room_id = %id, owner_id, attempt, "room registered");
                return Ok(id);
            }

            counter!("registry.create.conflicts").increment(1);
            warn!(room_id = %id, attempt, "room id already taken, regenerating");
        }

        Err(RegistryError::IdsExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Read a room record back from the store
    pub async fn room(&self, id: &RoomId) -> Result<Option<RoomRecord>, RegistryError> {
        match self.store.get(&record_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
