//! Event handlers for processing NATS messages

mod ingest_events;

pub use ingest_events::{IngestEventHandler, Routing};

use crate::messaging::ReceivedMessage;
use async_trait::async_trait;
use eyre::Result;

/// Trait for event handlers
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an incoming message
    async fn handle(&self, message: ReceivedMessage) -> Result<()>;
}
