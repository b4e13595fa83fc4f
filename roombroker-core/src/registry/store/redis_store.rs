//! Redis-backed coordination store

use super::{CoordinationStore, StoreError};
use async_trait::async_trait;

/// Redis store over a multiplexed, auto-reconnecting connection
///
/// Cloning the connection manager is cheap and every clone shares the same
/// underlying connection, so each call takes its own handle.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        if url.starts_with("rediss://") {
            tracing::info!("Redis TLS enabled (rediss://)");
        } else {
            tracing::info!("Redis TLS not enabled (redis://)");
        }

        let client = redis::Client::open(url)
            .map_err(|e| StoreError::UnsupportedUrl(format!("{}: {}", url, e)))?;

        tracing::debug!("Getting Redis connection manager...");
        let conn = client.get_connection_manager().await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CoordinationStore for RedisStore {
    async fn put_if_absent(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        // SET NX replies OK when written and nil when the key exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
