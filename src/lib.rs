pub mod classifier;
pub mod config;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod server;
pub mod storage;

pub use classifier::Classification;
pub use config::{Config, LimitPolicy};
pub use error::{Error, Result, StoreError};
pub use limiter::RateLimiter;
pub use middleware::RateLimitState;
pub use server::{create_app, Server};
pub use storage::Storage;
