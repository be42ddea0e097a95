use crate::config::Config;
use crate::limiter::RateLimiter;
use crate::middleware::{rate_limit, RateLimitState};
use crate::storage::RedisStorage;
use axum::routing::any;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Build the application router: a single pass-through root endpoint
/// behind the rate-limit middleware.
pub fn create_app(state: RateLimitState) -> Router {
    Router::new().route("/", any(root)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(state, rate_limit)),
    )
}

async fn root() -> &'static str {
    "OK"
}

pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Connect the store, then serve until ctrl-c or SIGTERM.
    pub async fn run(self) -> crate::error::Result<()> {
        let storage = RedisStorage::connect(&self.config.redis_url).await?;
        let limiter = RateLimiter::new(Arc::new(storage));
        let state = RateLimitState::new(limiter, &self.config);
        let app = create_app(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.server_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("listening on {}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received ctrl-c, shutting down");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, shutting down");
        },
    }
}
