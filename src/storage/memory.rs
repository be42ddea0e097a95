use crate::error::StoreError;
use crate::storage::Storage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// In-process counter store with real TTL semantics.
///
/// Useful for tests and single-instance deployments that don't want a
/// Redis dependency. Counters and block markers are separate tables, so
/// expiry of one never touches the other. Expiry is lazy: entries are
/// dropped when a lookup finds them past their deadline.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    counters: HashMap<String, CounterEntry>,
    blocks: HashMap<String, Instant>,
    skew: Duration,
}

struct CounterEntry {
    count: i64,
    expires_at: Option<Instant>,
}

impl Inner {
    fn now(&self) -> Instant {
        Instant::now() + self.skew
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift the store's clock forward, expiring anything whose TTL falls
    /// inside the jump. Lets tests fast-forward windows and blocks
    /// instead of sleeping.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.skew += by;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<i64, StoreError> {
        let mut inner = self.lock()?;
        let now = inner.now();
        match inner.counters.get(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| at > now) => Ok(entry.count),
            Some(_) => {
                inner.counters.remove(key);
                Ok(0)
            }
            None => Ok(0),
        }
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let expires_at = Some(inner.now() + ttl);
        inner.counters.insert(
            key.to_string(),
            CounterEntry {
                count: value,
                expires_at,
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let now = inner.now();
        match inner.counters.get_mut(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| at > now) => {
                entry.count += 1;
            }
            _ => {
                // Like Redis INCR on a missing key: starts at 1, no TTL.
                inner.counters.insert(
                    key.to_string(),
                    CounterEntry {
                        count: 1,
                        expires_at: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn is_blocked(&self, key: &str) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        let now = inner.now();
        match inner.blocks.get(key) {
            Some(expires_at) if *expires_at > now => true,
            Some(_) => {
                inner.blocks.remove(key);
                false
            }
            None => false,
        }
    }

    async fn block(&self, key: &str, duration: Duration) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let expires_at = inner.now() + duration;
        inner.blocks.insert(key.to_string(), expires_at);
        Ok(())
    }
}
