//! # SliqInvoice Worker
//!
//! Runs the Customer login reconciler against the API's database until
//! Ctrl-C.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p sliqinvoice-worker
//! ```

use anyhow::Context;
use sliqinvoice_shared::{
    db::pool::{close_pool, create_pool, DatabaseConfig},
    telemetry,
};
use sliqinvoice_worker::reconciler::{Reconciler, ReconcilerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (for development)
    dotenvy::dotenv().ok();

    telemetry::init("sliqinvoice_worker=debug,sliqinvoice_shared=info");

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "SliqInvoice worker starting");

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;
    let config = ReconcilerConfig::from_env()?;

    // The reconciler works one customer at a time
    let pool = create_pool(DatabaseConfig::new(database_url, 2))
        .await
        .context("Failed to connect to the database")?;

    let reconciler = Reconciler::new(pool.clone(), config);

    let shutdown = reconciler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
        tracing::info!("Shutdown signal received");
        shutdown.cancel();
    });

    reconciler.run().await;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}
