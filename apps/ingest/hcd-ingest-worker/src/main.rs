//! HCD Ingest Worker
//!
//! Consumes JSON events from NATS, embeds and enriches each one and inserts
//! it into an HCD Data API collection. Results go to the reply subject (or
//! the configured output subject); failures go to the dead-letter subject.

mod config;
mod context;
mod handlers;
mod messaging;

use crate::config::Config;
use crate::handlers::{IngestEventHandler, Routing};
use crate::messaging::NatsBroker;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_ingest::IngestionHandler;
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(worker_id = %config.worker_id, "Starting HCD ingest worker");

    let missing = config.missing_user_config();
    if !missing.is_empty() {
        warn!(
            missing = ?missing,
            "User configuration incomplete; every message will fail until it is set"
        );
    }

    let broker = Arc::new(NatsBroker::connect(&config.nats).await?);
    info!(nats_url = %config.nats.url, "Connected to NATS");

    let ingestion =
        IngestionHandler::http().with_embedding_failure_policy(config.embedding_failure);

    let handler = Arc::new(IngestEventHandler::new(
        broker.clone(),
        ingestion,
        config.user_config.clone(),
        Routing::from_config(&config),
        config.max_concurrent_handlers,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker = tokio::spawn(handler.run(shutdown_rx));

    tokio::select! {
        joined = &mut worker => joined.wrap_err("Worker task panicked")??,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, draining in-flight messages");
            let _ = shutdown_tx.send(true);
            worker.await.wrap_err("Worker task panicked")??;
        }
    }

    broker.flush().await?;
    info!("HCD ingest worker stopped");

    Ok(())
}
