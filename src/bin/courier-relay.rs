//! # Courier Outbox Relay
//!
//! Standalone binary that drains pending outbox rows to the broker. Run one
//! or more instances alongside the API process; row claiming uses
//! `FOR UPDATE SKIP LOCKED`, so instances never dispatch the same row twice.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin courier-relay
//!
//! # Run with specific environment
//! COURIER_ENV=production cargo run --bin courier-relay
//! ```

use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use courier_core::config::CourierConfig;
use courier_core::database::{DatabaseConnection, DatabaseMigrations};
use courier_core::logging;
use courier_core::messaging::{AmqpBroker, Broker};
use courier_core::services::OutboxRelay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("🚀 Starting Courier Outbox Relay...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config = CourierConfig::from_env();
    config.validate()?;

    let database = DatabaseConnection::connect(&config.database).await?;
    DatabaseMigrations::run_all(database.pool()).await?;

    let broker: Arc<dyn Broker> = Arc::new(AmqpBroker::connect(config.broker.clone()).await?);
    info!("   Broker: {}", broker.provider_name());

    let relay = OutboxRelay::new(database.pool().clone(), broker.clone(), config.relay.clone());

    let pending = relay.pending_count().await?;
    info!("   Pending outbox rows: {}", pending);
    info!("   Press Ctrl+C to shutdown gracefully");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay_handle = tokio::spawn(async move { relay.run(shutdown_rx).await });

    shutdown_signal().await;

    info!("🛑 Shutdown signal received, initiating graceful shutdown...");

    let _ = shutdown_tx.send(true);
    if let Err(e) = relay_handle.await {
        error!("Relay task did not stop cleanly: {}", e);
    }

    if let Err(e) = broker.close().await {
        error!("Failed to close broker connection: {}", e);
    }
    database.close().await;

    info!("👋 Courier Outbox Relay shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
