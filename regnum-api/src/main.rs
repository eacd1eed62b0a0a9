//! # Regnum Pecunia API Server
//!
//! HTTP back end for pharmaceutical inventory tracking with role-based
//! access for administrators, suppliers, pharmacists, clinics and health
//! staff.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p regnum-api
//! ```

use anyhow::Context;
use regnum_api::{
    app::{build_router, AppState},
    config::Config,
};
use regnum_shared::db::{
    gateway::PgGateway,
    migrations::{get_migration_status, run_migrations},
    pool::{close_pool, create_pool},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regnum_api=debug,regnum_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Regnum Pecunia API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(config = ?config, "Configuration loaded");

    let pool = create_pool(&config.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to apply database migrations")?;
    let status = get_migration_status(&pool)
        .await
        .context("Failed to read migration status")?;
    tracing::info!(
        applied = status.applied_migrations,
        version = ?status.latest_version,
        "Database schema is up to date"
    );

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgGateway::new(pool.clone())), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
