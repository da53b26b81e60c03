//! # SliqInvoice API Server
//!
//! Serves the admin JSON API and, when `STATIC_DIR` is set, the dashboard
//! pages, all behind the session cookie gate.
//!
//! ## Startup
//!
//! 1. Load configuration (fails fast without `DATABASE_URL` / `JWT_SECRET`)
//! 2. Connect to PostgreSQL and apply migrations
//! 3. Ensure the seed administrator, if configured
//! 4. Serve until Ctrl-C / SIGTERM, then drain and close the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p sliqinvoice-api
//! ```

use anyhow::Context;
use sliqinvoice_api::{
    app::{build_router, AppState},
    config::Config,
};
use sliqinvoice_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
        seed::{ensure_admin, SeedOutcome},
    },
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    telemetry::init("sliqinvoice_api=debug,sliqinvoice_shared=info,tower_http=info");

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        production = config.api.production,
        "SliqInvoice API server starting"
    );

    let pool = create_pool(DatabaseConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await
    .context("Failed to connect to the database")?;

    run_migrations(&pool).await.context("Failed to run migrations")?;

    if let Some(seed) = &config.seed_admin {
        match ensure_admin(&pool, &seed.email, &seed.password).await? {
            SeedOutcome::Created => tracing::info!(email = %seed.email, "Seed admin created"),
            SeedOutcome::AlreadyPresent => tracing::debug!(email = %seed.email, "Seed admin already present"),
        }
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
