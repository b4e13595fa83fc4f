//! Coordination store abstraction
//!
//! The registry only needs create-if-absent writes, point reads and a
//! liveness probe. Redis provides them for fleet deployments; the in-memory
//! store serves single-node development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod memory_store;
pub mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store rejected request: {0}")]
    Rejected(String),

    #[error("unsupported store url: {0}")]
    UnsupportedUrl(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
        {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Rejected(err.to_string())
        }
    }
}

/// Key-value store shared by every broker replica
///
/// Implementations must tolerate concurrent use from many in-flight calls
/// without external locking.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Write `value` under `key` unless the key already exists
    ///
    /// Returns `false` when the key was taken; the existing value is untouched.
    async fn put_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Read the value under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Round-trip to the store
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Open the store named by `url` and confirm it answers
pub async fn connect(url: &str) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    let store = open(url).await?;
    ensure_reachable(store).await
}

/// Open the store named by `url` without probing it
pub async fn open(url: &str) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    if url.starts_with("memory://") {
        tracing::warn!("Using process-local memory store; rooms are not shared with other replicas");
        Ok(Arc::new(MemoryStore::new()))
    } else if url.starts_with("redis://") || url.starts_with("rediss://") {
        Ok(Arc::new(RedisStore::connect(url).await?))
    } else {
        Err(StoreError::UnsupportedUrl(url.to_string()))
    }
}

/// Hand the store back only if it answers a ping
pub async fn ensure_reachable(
    store: Arc<dyn CoordinationStore>,
) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    store.ping().await?;
    Ok(store)
}
