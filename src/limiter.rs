use crate::error::StoreError;
use crate::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed-window rate limiter with a hard block on overflow.
///
/// Holds no state of its own; every decision round-trips to the shared
/// store, which is what keeps multiple instances in agreement. Safe to
/// clone into each request task.
#[derive(Clone)]
pub struct RateLimiter {
    storage: Arc<dyn Storage>,
}

impl RateLimiter {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Decide whether one more request under `key` is admitted.
    ///
    /// The window's TTL is established by the `set` on the transition
    /// from 0 and deliberately never refreshed by `incr`, so the count
    /// resets only when the store expires the key. Reaching `limit`
    /// installs a block for `block_duration` and denies the triggering
    /// request. Store failures deny (fail-closed), except the blocked
    /// lookup, which the backend already treats as "not blocked" on
    /// error.
    ///
    /// Two concurrent callers can both observe `limit - 1` and both
    /// increment; that overshoot is bounded by the concurrency degree
    /// and accepted in exchange for not locking across store calls.
    pub async fn is_allowed(
        &self,
        key: &str,
        limit: i64,
        window: Duration,
        block_duration: Duration,
    ) -> bool {
        if self.storage.is_blocked(key).await {
            debug!(key, "request denied, key is blocked");
            return false;
        }

        let current = match self.storage.get(key).await {
            Ok(count) => count,
            Err(err) => {
                warn!(key, error = %err, "counter read failed, denying request");
                return false;
            }
        };

        if current >= limit {
            if let Err(err) = self.storage.block(key, block_duration).await {
                // Denied either way; the counter path re-triggers the
                // block once the store is reachable again.
                warn!(key, error = %err, "block write failed");
            }
            debug!(key, current, limit, "limit reached, key blocked");
            return false;
        }

        if current == 0 {
            return match self.storage.set(key, 1, window).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(key, error = %err, "window open failed, denying request");
                    false
                }
            };
        }

        match self.storage.incr(key).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "increment failed, denying request");
                false
            }
        }
    }

    /// Pre-block a key without going through the counting path.
    pub async fn block(&self, key: &str, duration: Duration) -> Result<(), StoreError> {
        self.storage.block(key, duration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;

    fn limiter() -> (RateLimiter, MemoryStorage) {
        let store = MemoryStorage::new();
        (RateLimiter::new(Arc::new(store.clone())), store)
    }

    const WINDOW: Duration = Duration::from_secs(1);
    const BLOCK: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn admits_up_to_the_limit_then_denies() {
        let (limiter, _) = limiter();
        for _ in 0..5 {
            assert!(limiter.is_allowed("k", 5, WINDOW, BLOCK).await);
        }
        assert!(!limiter.is_allowed("k", 5, WINDOW, BLOCK).await);
    }

    #[tokio::test]
    async fn sixth_call_blocks_and_seventh_is_denied_by_the_block() {
        let (limiter, store) = limiter();
        for _ in 0..5 {
            assert!(limiter.is_allowed("k", 5, WINDOW, BLOCK).await);
        }
        assert!(!store.is_blocked("k").await);
        assert!(!limiter.is_allowed("k", 5, WINDOW, BLOCK).await);
        assert!(store.is_blocked("k").await);
        assert!(!limiter.is_allowed("k", 5, WINDOW, BLOCK).await);
    }

    #[tokio::test]
    async fn denied_until_the_block_expires() {
        let (limiter, store) = limiter();
        assert!(limiter.is_allowed("k", 1, Duration::from_secs(600), Duration::from_secs(5)).await);
        assert!(!limiter.is_allowed("k", 1, Duration::from_secs(600), Duration::from_secs(5)).await);
        assert!(store.is_blocked("k").await);

        // Block expires; the long-lived counter is still at the limit,
        // so the next call re-blocks rather than admitting.
        store.advance(Duration::from_secs(6));
        assert!(!store.is_blocked("k").await);
        assert!(!limiter.is_allowed("k", 1, Duration::from_secs(600), Duration::from_secs(5)).await);
        assert!(store.is_blocked("k").await);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_count() {
        let (limiter, store) = limiter();
        for _ in 0..3 {
            assert!(limiter.is_allowed("k", 3, WINDOW, BLOCK).await);
        }
        store.advance(Duration::from_secs(2));
        assert!(limiter.is_allowed("k", 3, WINDOW, BLOCK).await);
    }

    #[tokio::test]
    async fn distinct_keys_are_isolated() {
        let (limiter, store) = limiter();
        assert!(limiter.is_allowed("a", 1, WINDOW, BLOCK).await);
        assert!(!limiter.is_allowed("a", 1, WINDOW, BLOCK).await);
        assert!(store.is_blocked("a").await);

        assert!(limiter.is_allowed("b", 1, WINDOW, BLOCK).await);
        assert!(!store.is_blocked("b").await);
    }

    #[tokio::test]
    async fn zero_limit_denies_the_first_request_and_blocks() {
        let (limiter, store) = limiter();
        assert!(!limiter.is_allowed("k", 0, WINDOW, BLOCK).await);
        assert!(store.is_blocked("k").await);
    }

    #[tokio::test]
    async fn negative_limit_denies_immediately() {
        let (limiter, store) = limiter();
        assert!(!limiter.is_allowed("k", -3, WINDOW, BLOCK).await);
        assert!(store.is_blocked("k").await);
    }

    #[tokio::test]
    async fn explicit_block_short_circuits_counting() {
        let (limiter, _) = limiter();
        limiter.block("k", BLOCK).await.unwrap();
        assert!(!limiter.is_allowed("k", 100, WINDOW, BLOCK).await);
    }

    /// Store double whose counting path fails while the block lookup
    /// stays answerable, for exercising the fail-closed/fail-open split.
    struct FailingStorage;

    #[async_trait]
    impl Storage for FailingStorage {
        async fn get(&self, _key: &str) -> Result<i64, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn set(&self, _key: &str, _value: i64, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn incr(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn is_blocked(&self, _key: &str) -> bool {
            // Fail-open: lookup errors read as "not blocked".
            false
        }
        async fn block(&self, _key: &str, _duration: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn counter_read_failure_denies() {
        let limiter = RateLimiter::new(Arc::new(FailingStorage));
        assert!(!limiter.is_allowed("k", 5, WINDOW, BLOCK).await);
    }
}
