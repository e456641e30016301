//! Per-invocation ingestion pipeline
//!
//! ```text
//! START → PARSE → PROVISION → EMBED → ENRICH → INSERT → DONE
//!            └──────────┴─────────┴────────┴────────┴──→ FAILED(stage, cause)
//! ```
//!
//! Every fatal failure is logged through the invocation context and returned
//! to the host, which owns redelivery and dead-lettering.

use std::sync::Arc;

use tracing::{Level, instrument};

use crate::clock::{Clock, SystemClock};
use crate::context::{ClientSettings, InvocationContext};
use crate::embedding::{EmbeddingProvider, OpenAIConfig, OpenAIProvider};
use crate::enricher::enrich;
use crate::error::{IngestError, IngestResult};
use crate::models::{EmbeddingModel, IngestRecord, VECTOR_DIMENSION};
use crate::provisioner::CollectionProvisioner;
use crate::store::{DataApiConfig, DataApiStore, DocumentStore};

const EMBEDDING_MODEL: EmbeddingModel = EmbeddingModel::TextEmbedding3Small;

/// What to do when the embedding call fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingFailurePolicy {
    /// Log the error and ingest the record without a vector
    #[default]
    Continue,
    /// Abort the invocation like every other stage
    Fail,
}

/// Builds the external clients for one invocation
pub trait ClientFactory: Send + Sync {
    fn embedding_provider(
        &self,
        settings: &ClientSettings,
    ) -> IngestResult<Arc<dyn EmbeddingProvider>>;

    fn document_store(&self, settings: &ClientSettings) -> IngestResult<Arc<dyn DocumentStore>>;
}

/// OpenAI embeddings + Data API store
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    openai_base_url: Option<String>,
    store_timeout_secs: Option<u64>,
}

impl HttpClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_openai_base_url(mut self, base_url: String) -> Self {
        self.openai_base_url = Some(base_url);
        self
    }

    pub fn with_store_timeout(mut self, secs: u64) -> Self {
        self.store_timeout_secs = Some(secs);
        self
    }
}

impl ClientFactory for HttpClientFactory {
    fn embedding_provider(
        &self,
        settings: &ClientSettings,
    ) -> IngestResult<Arc<dyn EmbeddingProvider>> {
        let mut config = OpenAIConfig::new(settings.api_key.clone());
        if let Some(base_url) = &self.openai_base_url {
            config = config.with_base_url(base_url.clone());
        }
        Ok(Arc::new(OpenAIProvider::new(config)?))
    }

    fn document_store(&self, settings: &ClientSettings) -> IngestResult<Arc<dyn DocumentStore>> {
        let mut config = DataApiConfig::new(settings.endpoint.clone(), settings.token.clone())
            .with_keyspace(settings.namespace.clone());
        if let Some(secs) = self.store_timeout_secs {
            config = config.with_timeout(secs);
        }
        Ok(Arc::new(DataApiStore::new(config)?))
    }
}

/// Runs one event through the ingestion pipeline
pub struct IngestionHandler<F: ClientFactory = HttpClientFactory> {
    factory: F,
    clock: Arc<dyn Clock>,
    embedding_failure: EmbeddingFailurePolicy,
}

impl IngestionHandler<HttpClientFactory> {
    pub fn http() -> Self {
        Self::new(HttpClientFactory::new())
    }
}

impl<F: ClientFactory> IngestionHandler<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            clock: Arc::new(SystemClock),
            embedding_failure: EmbeddingFailurePolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_embedding_failure_policy(mut self, policy: EmbeddingFailurePolicy) -> Self {
        self.embedding_failure = policy;
        self
    }

    /// Ingest one raw JSON event and return the enriched event as JSON
    #[instrument(skip_all, fields(invocation_id = %ctx.invocation_id()))]
    pub async fn handle(&self, input: &str, ctx: &dyn InvocationContext) -> IngestResult<String> {
        let record = IngestRecord::parse(input).map_err(|e| report(ctx, e))?;
        let record = self.process(record, ctx).await?;
        Ok(record.to_json())
    }

    /// Provision, embed, enrich and insert an already parsed record
    pub async fn process(
        &self,
        record: IngestRecord,
        ctx: &dyn InvocationContext,
    ) -> IngestResult<IngestRecord> {
        let settings = ClientSettings::from_context(ctx).map_err(|e| report(ctx, e))?;
        let embedder = self
            .factory
            .embedding_provider(&settings)
            .map_err(|e| report(ctx, e))?;
        let store = self
            .factory
            .document_store(&settings)
            .map_err(|e| report(ctx, e))?;

        let provisioner = CollectionProvisioner::new(store.clone());
        let collection = provisioner
            .ensure_collection(&settings.collection)
            .await
            .map_err(|e| report(ctx, e))?;

        let vector = self.embed(embedder.as_ref(), record.content(), ctx).await?;

        let record = enrich(record, vector, self.clock.now()).map_err(|e| report(ctx, e))?;

        store
            .insert_one(&collection.name, record.fields().clone())
            .await
            .map_err(|e| report(ctx, IngestError::Insert(e.to_string())))?;

        ctx.log(
            Level::INFO,
            &format!(
                "Data with message id {} successfully inserted into HCD DB collection {}.",
                ctx.invocation_id(),
                collection.name
            ),
        );

        Ok(record)
    }

    async fn embed(
        &self,
        provider: &dyn EmbeddingProvider,
        text: &str,
        ctx: &dyn InvocationContext,
    ) -> IngestResult<Option<Vec<f32>>> {
        let result = provider
            .embed(EMBEDDING_MODEL, text)
            .await
            .and_then(|embedding| {
                if embedding.values.len() != VECTOR_DIMENSION as usize {
                    return Err(IngestError::Embedding(format!(
                        "expected {} dimensions, got {}",
                        VECTOR_DIMENSION,
                        embedding.values.len()
                    )));
                }
                Ok(embedding.values)
            });

        match (result, self.embedding_failure) {
            (Ok(values), _) => Ok(Some(values)),
            (Err(e), EmbeddingFailurePolicy::Continue) => {
                ctx.log(Level::ERROR, &failure_message(&e));
                Ok(None)
            }
            (Err(e), EmbeddingFailurePolicy::Fail) => Err(report(ctx, e)),
        }
    }
}

fn failure_message(err: &IngestError) -> String {
    match err {
        IngestError::Parse(_) => format!("Error parsing input: {}", err),
        IngestError::ClientInit(_) => {
            format!("Error initializing HCD DB client or getting database: {}", err)
        }
        IngestError::Provisioning(_) => format!("Error getting collection from HCD DB: {}", err),
        IngestError::Embedding(_) => format!("Could not generate embedding: {}", err),
        IngestError::MissingTitle => format!("Error enriching record: {}", err),
        IngestError::Insert(_) => {
            format!("Error inserting data into HCD DB collection: {}", err)
        }
    }
}

fn report(ctx: &dyn InvocationContext, err: IngestError) -> IngestError {
    ctx.log(Level::ERROR, &failure_message(&err));
    err
}
