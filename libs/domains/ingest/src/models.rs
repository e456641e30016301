use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IngestError, IngestResult};

/// Vector dimension of every collection this worker provisions
pub const VECTOR_DIMENSION: u32 = 1536;

/// Keyspace all collections live in
pub const DEFAULT_NAMESPACE: &str = "default_namespace";

/// Value of `metadata.source` on every ingested record
pub const INGEST_SOURCE: &str = "Pulsar";

/// An incoming event, kept as a JSON object so unknown fields pass through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngestRecord {
    fields: Map<String, Value>,
}

impl IngestRecord {
    /// Parse a raw event. The only schema requirement is a string `content`.
    pub fn parse(input: &str) -> IngestResult<Self> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> IngestResult<Self> {
        let Value::Object(fields) = value else {
            return Err(IngestError::Parse(
                "event must be a JSON object".to_string(),
            ));
        };

        match fields.get("content") {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(_) => Err(IngestError::Parse(
                "`content` must be a string".to_string(),
            )),
            None => Err(IngestError::Parse("missing `content` field".to_string())),
        }
    }

    pub fn content(&self) -> &str {
        self.fields
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    pub fn vector(&self) -> Option<Vec<f32>> {
        let values = self.fields.get("vector")?.as_array()?;
        values
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect()
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.fields
            .get("metadata")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set_vector(&mut self, vector: Vec<f32>) {
        self.fields.insert("vector".to_string(), Value::from(vector));
    }

    /// Drop any caller-supplied `vector` / `$vector` field
    pub fn clear_vector(&mut self) {
        self.fields.shift_remove("vector");
        self.fields.shift_remove("$vector");
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        // Metadata holds only strings, serialization cannot fail
        let value = serde_json::to_value(metadata).unwrap_or(Value::Null);
        self.fields.insert("metadata".to_string(), value);
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    /// Serialize back to the JSON encoding the event arrived in
    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

/// Metadata attached to every ingested record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    pub title: String,
    pub date: String,
    pub timestamp: String,
}

/// Similarity metric of a vector collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl VectorMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "cosine",
            VectorMetric::Euclidean => "euclidean",
            VectorMetric::DotProduct => "dot_product",
        }
    }
}

/// Definition of a collection to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    pub name: String,
    pub dimension: u32,
    pub metric: VectorMetric,
}

impl CollectionConfig {
    /// Config with the fixed ingestion vector settings (1536, cosine)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension: VECTOR_DIMENSION,
            metric: VectorMetric::Cosine,
        }
    }
}

/// A collection known to exist in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    pub name: String,
    /// True when this call issued the create
    pub created: bool,
}

/// Embedding model selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmbeddingModel {
    /// OpenAI text-embedding-3-small (1536 dimensions)
    #[default]
    TextEmbedding3Small,
    /// OpenAI text-embedding-3-large (3072 dimensions)
    TextEmbedding3Large,
    /// OpenAI text-embedding-ada-002 (1536 dimensions, legacy)
    TextEmbeddingAda002,
}

impl EmbeddingModel {
    pub fn dimension(&self) -> u32 {
        match self {
            EmbeddingModel::TextEmbedding3Small => 1536,
            EmbeddingModel::TextEmbedding3Large => 3072,
            EmbeddingModel::TextEmbeddingAda002 => 1536,
        }
    }

    pub fn model_name(&self) -> &'static str {
        match self {
            EmbeddingModel::TextEmbedding3Small => "text-embedding-3-small",
            EmbeddingModel::TextEmbedding3Large => "text-embedding-3-large",
            EmbeddingModel::TextEmbeddingAda002 => "text-embedding-ada-002",
        }
    }
}

/// Embedding result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResult {
    pub values: Vec<f32>,
    pub dimension: u32,
    pub tokens_used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_extra_fields_in_order() {
        let record =
            IngestRecord::parse(r#"{"content":"hi","zeta":1,"title":"T","alpha":[true]}"#)
                .unwrap();

        let keys: Vec<&str> = record.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["content", "zeta", "title", "alpha"]);
        assert_eq!(record.content(), "hi");
        assert_eq!(record.title(), Some("T"));
        assert_eq!(record.get("alpha"), Some(&json!([true])));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = IngestRecord::parse("{not json").unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = IngestRecord::parse(r#"["content"]"#).unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }

    #[test]
    fn test_parse_requires_string_content() {
        let missing = IngestRecord::parse(r#"{"title":"T"}"#).unwrap_err();
        assert!(missing.to_string().contains("content"));

        let wrong_type = IngestRecord::parse(r#"{"content":42}"#).unwrap_err();
        assert!(matches!(wrong_type, IngestError::Parse(_)));
    }

    #[test]
    fn test_parse_does_not_require_title() {
        let record = IngestRecord::parse(r#"{"content":"hi"}"#).unwrap();
        assert_eq!(record.title(), None);
    }

    #[test]
    fn test_vector_accessor() {
        let mut record = IngestRecord::parse(r#"{"content":"hi"}"#).unwrap();
        assert!(record.vector().is_none());

        record.set_vector(vec![0.5, -1.0]);
        assert_eq!(record.vector(), Some(vec![0.5, -1.0]));
    }

    #[test]
    fn test_clear_vector_removes_both_spellings() {
        let mut record =
            IngestRecord::parse(r#"{"content":"hi","vector":[1.0],"$vector":[2.0],"title":"T"}"#)
                .unwrap();

        record.clear_vector();

        let keys: Vec<&str> = record.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["content", "title"]);
    }

    #[test]
    fn test_collection_config_defaults() {
        let config = CollectionConfig::new("docs");
        assert_eq!(config.name, "docs");
        assert_eq!(config.dimension, 1536);
        assert_eq!(config.metric, VectorMetric::Cosine);
        assert_eq!(config.metric.as_str(), "cosine");
    }

    #[test]
    fn test_model_names() {
        assert_eq!(
            EmbeddingModel::TextEmbedding3Small.model_name(),
            "text-embedding-3-small"
        );
        assert_eq!(
            EmbeddingModel::TextEmbeddingAda002.model_name(),
            "text-embedding-ada-002"
        );
    }

    #[test]
    fn test_model_dimensions() {
        assert_eq!(EmbeddingModel::default().dimension(), VECTOR_DIMENSION);
        assert_eq!(EmbeddingModel::TextEmbedding3Large.dimension(), 3072);
    }
}
