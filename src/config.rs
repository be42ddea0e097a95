use std::time::Duration;

/// Runtime configuration, sourced from environment variables.
///
/// Every variable has a documented default; malformed values fall back
/// to the default silently rather than failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL
    pub redis_url: String,
    /// Max requests per window for IP-keyed clients
    pub ip_limit: i64,
    /// Max requests per window for token-keyed clients
    pub token_limit: i64,
    /// Window duration for IP-keyed clients
    pub ip_window: Duration,
    /// Window duration for token-keyed clients
    pub token_window: Duration,
    /// Block duration applied once an IP exceeds its limit
    pub ip_block: Duration,
    /// Block duration applied once a token exceeds its limit
    pub token_block: Duration,
    /// HTTP listen port
    pub server_port: u16,
}

/// Limit/window/block triple for one classification kind.
#[derive(Debug, Clone, Copy)]
pub struct LimitPolicy {
    pub limit: i64,
    pub window: Duration,
    pub block: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// The seam tests use instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            redis_url: get_str(&lookup, "REDIS_URL", "redis://127.0.0.1:6379"),
            ip_limit: get_int(&lookup, "IP_LIMIT", 5),
            token_limit: get_int(&lookup, "TOKEN_LIMIT", 10),
            ip_window: get_duration(&lookup, "IP_DURATION", Duration::from_secs(1)),
            token_window: get_duration(&lookup, "TOKEN_DURATION", Duration::from_secs(1)),
            ip_block: get_duration(&lookup, "IP_BLOCK_TIME", Duration::from_secs(5 * 60)),
            token_block: get_duration(&lookup, "TOKEN_BLOCK_TIME", Duration::from_secs(6 * 60)),
            server_port: get_int(&lookup, "SERVER_PORT", 8080u16),
        }
    }

    pub fn ip_policy(&self) -> LimitPolicy {
        LimitPolicy {
            limit: self.ip_limit,
            window: self.ip_window,
            block: self.ip_block,
        }
    }

    pub fn token_policy(&self) -> LimitPolicy {
        LimitPolicy {
            limit: self.token_limit,
            window: self.token_window,
            block: self.token_block,
        }
    }
}

fn get_str(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    match lookup(key) {
        Some(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

fn get_int<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn get_duration(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|value| humantime::parse_duration(value.trim()).ok())
        .unwrap_or(default)
}
