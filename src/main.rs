use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_digest::config::Config;
use feed_digest::fetcher::Fetcher;
use feed_digest::orchestrator::Orchestrator;
use feed_digest::render::write_outputs;
use feed_digest::sources::load_sources;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_digest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("FEED_DIGEST_CONFIG").unwrap_or_else(|_| "digest.toml".to_string());
    let config = Config::load_or_default(&config_path)?;

    let sources = load_sources(&config.accounts_path, &config)?;
    info!("Loaded {} feeds from {}", sources.len(), config.accounts_path.display());

    let fetcher = Fetcher::new(&config).context("Failed to create HTTP client")?;
    let digest = Orchestrator::new(fetcher).run(sources).await?;

    write_outputs(&digest.entries, &config)?;

    Ok(())
}
