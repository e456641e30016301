//! Data API (HCD / Astra) implementation of [`DocumentStore`]
//!
//! Every command is a JSON `POST` against
//! `{endpoint}/api/json/v1/{keyspace}[/{collection}]` authenticated with a
//! `Token` header. Failures come back as HTTP 200 with an `errors` array, so
//! both the status code and the body are inspected.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use super::DocumentStore;
use crate::error::{IngestError, IngestResult, StoreError, StoreResult};
use crate::models::{CollectionConfig, DEFAULT_NAMESPACE};

const API_PATH: &str = "api/json/v1";
const COLLECTION_EXISTS_CODE: &str = "COLLECTION_ALREADY_EXISTS";
const DOCUMENT_EXISTS_CODE: &str = "DOCUMENT_ALREADY_EXISTS";

/// Data API connection configuration
#[derive(Debug, Clone)]
pub struct DataApiConfig {
    pub endpoint: String,
    pub token: String,
    pub keyspace: String,
    pub timeout_secs: u64,
}

impl DataApiConfig {
    pub fn new(endpoint: String, token: String) -> Self {
        Self {
            endpoint,
            token,
            keyspace: DEFAULT_NAMESPACE.to_string(),
            timeout_secs: 30,
        }
    }

    pub fn with_keyspace(mut self, keyspace: String) -> Self {
        self.keyspace = keyspace;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn from_env() -> IngestResult<Self> {
        let endpoint = std::env::var("HCD_ENDPOINT")
            .map_err(|_| IngestError::ClientInit("HCD_ENDPOINT not set".to_string()))?;

        let token = std::env::var("HCD_TOKEN")
            .map_err(|_| IngestError::ClientInit("HCD_TOKEN not set".to_string()))?;

        let timeout_secs = std::env::var("HCD_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self::new(endpoint, token).with_timeout(timeout_secs))
    }
}

/// Data API backed document store
pub struct DataApiStore {
    client: Client,
    config: DataApiConfig,
}

impl DataApiStore {
    pub fn new(config: DataApiConfig) -> IngestResult<Self> {
        let url = reqwest::Url::parse(&config.endpoint).map_err(|e| {
            IngestError::ClientInit(format!("Invalid endpoint {}: {}", config.endpoint, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IngestError::ClientInit(format!(
                "Unsupported endpoint scheme: {}",
                url.scheme()
            )));
        }
        if config.token.trim().is_empty() {
            return Err(IngestError::ClientInit("missing Data API token".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IngestError::ClientInit(format!("Failed to build client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn keyspace(&self) -> &str {
        &self.config.keyspace
    }

    fn keyspace_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            API_PATH,
            self.config.keyspace
        )
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.keyspace_url(), collection)
    }

    async fn command(&self, url: &str, body: Value) -> StoreResult<CommandStatus> {
        let response = self
            .client
            .post(url)
            .header("Token", &self.config.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Api {
                code: status.as_u16().to_string(),
                message: text,
            });
        }

        let parsed: CommandResponse = serde_json::from_str(&text)?;

        if let Some(error) = parsed.errors.into_iter().next() {
            let code = error.error_code.unwrap_or_default();
            let message = error.message.unwrap_or_default();
            return Err(match code.as_str() {
                COLLECTION_EXISTS_CODE => StoreError::AlreadyExists(message),
                DOCUMENT_EXISTS_CODE => StoreError::DuplicateDocument(message),
                _ => StoreError::Api { code, message },
            });
        }

        Ok(parsed.status.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    status: Option<CommandStatus>,
    #[serde(default)]
    errors: Vec<CommandError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandStatus {
    #[serde(default)]
    collections: Option<Vec<String>>,
    #[serde(default)]
    inserted_ids: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Move the record's `vector` field into the Data API's reserved `$vector`
fn to_store_document(mut document: Map<String, Value>) -> Map<String, Value> {
    if let Some(vector) = document.shift_remove("vector") {
        document.insert("$vector".to_string(), vector);
    }
    document
}

#[async_trait]
impl DocumentStore for DataApiStore {
    #[instrument(skip(self), fields(keyspace = %self.config.keyspace))]
    async fn list_collection_names(&self) -> StoreResult<Vec<String>> {
        let status = self
            .command(&self.keyspace_url(), json!({"findCollections": {}}))
            .await?;

        status.collections.ok_or_else(|| {
            StoreError::InvalidResponse("findCollections returned no collections".to_string())
        })
    }

    #[instrument(skip(self, config), fields(collection = %config.name))]
    async fn create_collection(&self, config: &CollectionConfig) -> StoreResult<()> {
        let body = json!({
            "createCollection": {
                "name": config.name,
                "options": {
                    "vector": {
                        "dimension": config.dimension,
                        "metric": config.metric.as_str(),
                    }
                }
            }
        });

        self.command(&self.keyspace_url(), body).await?;
        debug!("Collection created");
        Ok(())
    }

    #[instrument(skip(self, document), fields(collection = %collection))]
    async fn insert_one(
        &self,
        collection: &str,
        document: Map<String, Value>,
    ) -> StoreResult<Option<Value>> {
        let body = json!({"insertOne": {"document": to_store_document(document)}});

        let status = self.command(&self.collection_url(collection), body).await?;
        Ok(status.inserted_ids.and_then(|ids| ids.into_iter().next()))
    }
}
