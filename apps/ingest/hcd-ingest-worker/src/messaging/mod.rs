//! Messaging abstraction layer
//!
//! Trait-based pub/sub so the worker loop can run against NATS in production
//! and an in-memory broker in tests.

mod nats_broker;

pub use nats_broker::NatsBroker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};

/// Header carrying a publisher-assigned message id
pub const MESSAGE_ID_HEADER: &str = "Nats-Msg-Id";

/// Received message with metadata
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Subject/topic the message was received on
    pub subject: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Reply subject for request-reply patterns
    pub reply: Option<String>,
    /// Publisher-assigned id, when the publisher set one
    pub message_id: Option<String>,
}

/// Entry published to the dead-letter subject when an ingestion fails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub message_id: String,
    pub subject: String,
    pub stage: String,
    pub error: String,
    /// Original payload, lossily decoded as UTF-8
    pub payload: String,
    pub failed_at: DateTime<Utc>,
}

/// Abstract message broker interface
#[async_trait]
pub trait MessageBroker: Send + Sync + 'static {
    /// Publish raw bytes to a subject
    async fn publish_raw(&self, subject: &str, payload: &[u8]) -> Result<()>;

    /// Publish a value serialized as JSON
    async fn publish<T: Serialize + Send + Sync>(&self, subject: &str, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)?;
        self.publish_raw(subject, &payload).await
    }

    /// Create a queue group subscription (load-balanced across workers)
    async fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<Box<dyn MessageStream>>;
}

/// Stream of incoming messages
#[async_trait]
pub trait MessageStream: Send + Sync {
    /// Receive the next message; `None` once the subscription is closed
    async fn next(&mut self) -> Option<ReceivedMessage>;
}
