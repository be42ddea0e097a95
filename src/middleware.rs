use crate::classifier::{classify, Classification};
use crate::config::{Config, LimitPolicy};
use crate::limiter::RateLimiter;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::info;

/// Body sent with every 429.
pub const LIMIT_REACHED_BODY: &str =
    "you have reached the maximum number of requests or actions allowed within a certain time frame";

/// Everything the rate-limit middleware needs per request: the shared
/// limiter and one policy per classification kind.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: RateLimiter,
    pub ip_policy: LimitPolicy,
    pub token_policy: LimitPolicy,
}

impl RateLimitState {
    pub fn new(limiter: RateLimiter, config: &Config) -> Self {
        Self {
            limiter,
            ip_policy: config.ip_policy(),
            token_policy: config.token_policy(),
        }
    }
}

/// Rate-limit middleware for `axum::middleware::from_fn_with_state`.
///
/// Classifies the request, applies the matching policy, and either
/// forwards it unchanged or short-circuits with a 429. Holds no
/// per-request state of its own.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let peer_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_default();

    let classification = classify(request.headers(), &peer_addr);
    let policy = match classification {
        Classification::Token(_) => &state.token_policy,
        Classification::Ip(_) => &state.ip_policy,
    };
    let key = classification.rate_key();

    let allowed = state
        .limiter
        .is_allowed(&key, policy.limit, policy.window, policy.block)
        .await;

    if allowed {
        next.run(request).await
    } else {
        info!(key, limit = policy.limit, "rate limit exceeded");
        (StatusCode::TOO_MANY_REQUESTS, LIMIT_REACHED_BODY).into_response()
    }
}
