use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::StoreResult;
use crate::models::CollectionConfig;

/// Document/vector store operations the ingestion pipeline needs
///
/// Bound to a single keyspace. Uniqueness of collection names and document
/// ids is enforced by the store, not by callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of all collections in the keyspace
    async fn list_collection_names(&self) -> StoreResult<Vec<String>>;

    /// Create a vector-enabled collection
    async fn create_collection(&self, config: &CollectionConfig) -> StoreResult<()>;

    /// Insert one document, returning the id the store assigned or kept
    async fn insert_one(
        &self,
        collection: &str,
        document: Map<String, Value>,
    ) -> StoreResult<Option<Value>>;
}
