//! Ingest Domain Library
//!
//! Single-record ingestion into an HCD / Astra Data API collection. One
//! invocation takes one JSON event, makes sure the target collection exists,
//! embeds the event's `content`, attaches metadata and inserts the result.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌─────────────────────┐
//! │ IngestionHandler │──▶│  InvocationContext  │  ← config, logging, message id
//! └───────┬──────────┘   └─────────────────────┘
//!         │
//!         ├──▶ CollectionProvisioner ──▶ DocumentStore (trait) ──▶ DataApiStore
//!         ├──▶ EmbeddingProvider (trait) ──▶ OpenAIProvider
//!         └──▶ enrich()  ← Clock
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_ingest::{ConfigKey, IngestionHandler, StaticContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = StaticContext::new("message-1")
//!     .with_config(ConfigKey::ApiKey, "sk-...")
//!     .with_config(ConfigKey::Endpoint, "http://localhost:8181")
//!     .with_config(ConfigKey::Token, "Cassandra:Y2Fzc2FuZHJh:Y2Fzc2FuZHJh")
//!     .with_config(ConfigKey::Collection, "documents");
//!
//! let handler = IngestionHandler::http();
//! let output = handler
//!     .handle(r#"{"content":"hello world","title":"Greeting"}"#, &ctx)
//!     .await?;
//! println!("{output}");
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod context;
pub mod embedding;
pub mod enricher;
pub mod error;
pub mod handler;
pub mod models;
pub mod provisioner;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{ClientSettings, ConfigKey, InvocationContext, StaticContext};
pub use embedding::{EmbeddingProvider, OpenAIConfig, OpenAIProvider};
pub use enricher::{enrich, format_timestamp};
pub use error::{IngestError, IngestResult, Stage, StoreError, StoreResult};
pub use handler::{ClientFactory, EmbeddingFailurePolicy, HttpClientFactory, IngestionHandler};
pub use models::{
    CollectionConfig, CollectionHandle, DEFAULT_NAMESPACE, EmbeddingModel, EmbeddingResult,
    INGEST_SOURCE, IngestRecord, Metadata, VECTOR_DIMENSION, VectorMetric,
};
pub use provisioner::CollectionProvisioner;
pub use store::{DataApiConfig, DataApiStore, DocumentStore};
