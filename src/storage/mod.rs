//! Expiring counter store contract and backends.
//!
//! All rate-limit state lives behind [`Storage`]: per-key counters with a
//! TTL-governed lifetime and independent, separately expiring block
//! markers. The limiter never caches in front of the store; every
//! decision round-trips, so multiple server instances sharing one store
//! see the same counts.

use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

pub mod memory;
pub mod redis;

pub use memory::MemoryStorage;
pub use redis::RedisStorage;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Current count for `key`, 0 when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<i64, StoreError>;

    /// Unconditionally set the count and reset its TTL.
    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically increment the count by 1, preserving the existing TTL.
    ///
    /// Incrementing a key that has no TTL is backend-defined; the limiter
    /// never does it (the window always starts with a `set`).
    async fn incr(&self, key: &str) -> Result<(), StoreError>;

    /// True iff a live block marker exists for `key`.
    ///
    /// Lookup failures are fail-open: an unreachable store reads as
    /// "not blocked".
    async fn is_blocked(&self, key: &str) -> bool;

    /// Create or overwrite a block marker for `key` with its own TTL.
    async fn block(&self, key: &str, duration: Duration) -> Result<(), StoreError>;
}
