use anyhow::Result;
use limitgate::config::Config;
use limitgate::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if one is present
    dotenv::dotenv().ok();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "limitgate=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        redis_url = %config.redis_url,
        port = config.server_port,
        ip_limit = config.ip_limit,
        token_limit = config.token_limit,
        "starting limitgate"
    );

    Server::new(config)
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}
