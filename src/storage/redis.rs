use crate::error::StoreError;
use crate::storage::Storage;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tracing::warn;

/// Redis-backed counter store.
///
/// Counters are plain integer keys expired with `PX`; block markers live
/// under `<key>_blocked` with the literal value `"true"` and their own
/// TTL. The two never share a key, so the store expires them
/// independently.
#[derive(Clone)]
pub struct RedisStorage {
    connection: MultiplexedConnection,
}

impl RedisStorage {
    /// Open a client for `redis_url` and establish the shared
    /// multiplexed connection.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { connection })
    }
}

fn block_key(key: &str) -> String {
    format!("{key}_blocked")
}

fn ttl_millis(ttl: Duration) -> u64 {
    // PX rejects 0; a zero TTL still has to produce a live key briefly.
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(value.unwrap_or(0))
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("INCR")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn is_blocked(&self, key: &str) -> bool {
        let mut conn = self.connection.clone();
        let result: Result<Option<String>, redis::RedisError> = redis::cmd("GET")
            .arg(block_key(key))
            .query_async(&mut conn)
            .await;
        match result {
            Ok(value) => value.as_deref() == Some("true"),
            Err(err) => {
                warn!(key, error = %err, "block lookup failed, treating as not blocked");
                false
            }
        }
    }

    async fn block(&self, key: &str, duration: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(block_key(key))
            .arg("true")
            .arg("PX")
            .arg(ttl_millis(duration))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}
