//! Scholar Chat - HTTP Server Entry Point
//!
//! Starts the HTTP server that serves the chat page and API.

use scholar_chat::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set
    let dotenv_path = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scholar_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={} base_url={}",
        config.model, config.model_base_url
    );

    api::serve(config).await?;

    Ok(())
}
