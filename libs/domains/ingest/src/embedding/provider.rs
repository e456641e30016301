use async_trait::async_trait;

use crate::error::IngestResult;
use crate::models::{EmbeddingModel, EmbeddingResult};

/// Trait for embedding generation providers
///
/// Turns a piece of text into a fixed-length vector. Implementations make a
/// single attempt; retrying is left to whoever redelivers the message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    async fn embed(&self, model: EmbeddingModel, text: &str) -> IngestResult<EmbeddingResult>;
}
