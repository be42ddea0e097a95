use thiserror::Error;

/// Failure of the shared counter store.
///
/// A store failure on the counting path denies the current request
/// (fail-closed); the blocked-check alone treats failures as "not
/// blocked" (fail-open). That asymmetry lives in the callers and the
/// backends, not here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
