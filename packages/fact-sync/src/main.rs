use anyhow::{Context, Result};
use kpi_client::KpiClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod runner;
mod transform;

use config::Config;
use runner::SyncJob;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fact_sync=debug,kpi_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(base_url = %config.base_url, limit = config.event_limit, "Starting fact sync");

    let client =
        KpiClient::new(&config.base_url).context("Failed to build KPI Drive client")?;

    let outcome = SyncJob::from_config(&config).run(&client).await?;

    tracing::info!(
        written = outcome.saved.len(),
        ids = ?outcome.saved,
        "Sync finished"
    );

    if let Some(message) = outcome.halted {
        tracing::error!(%message, "Batch halted on first write failure");
        std::process::exit(1);
    }

    Ok(())
}
