use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EmbeddingProvider;
use crate::error::{IngestError, IngestResult};
use crate::models::{EmbeddingModel, EmbeddingResult};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI embedding provider configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAIConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn from_env() -> IngestResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| IngestError::ClientInit("OPENAI_API_KEY not set".to_string()))?;

        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self { api_key, base_url })
    }
}

/// OpenAI embeddings provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig) -> IngestResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(IngestError::ClientInit("missing OpenAI API key".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    pub fn from_env() -> IngestResult<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct EmbeddingUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    async fn embed(&self, model: EmbeddingModel, text: &str) -> IngestResult<EmbeddingResult> {
        if text.trim().is_empty() {
            return Err(IngestError::Embedding(
                "cannot embed empty text".to_string(),
            ));
        }

        let request = EmbeddingRequest {
            model: model.model_name(),
            input: vec![text],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(IngestError::Embedding(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await?;
        let tokens_used = embedding_response
            .usage
            .map(|u| u.total_tokens)
            .unwrap_or(0);

        let data = embedding_response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::Embedding("No embedding returned".to_string()))?;

        debug!(
            model = model.model_name(),
            dimension = data.embedding.len(),
            tokens_used,
            "Generated embedding"
        );

        Ok(EmbeddingResult {
            dimension: data.embedding.len() as u32,
            values: data.embedding,
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAIProvider {
        let config = OpenAIConfig::new("sk-test".to_string()).with_base_url(server.uri());
        OpenAIProvider::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_embed_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "text-embedding-3-small",
                "input": ["hello world"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"embedding": vec![0.25; 1536], "index": 0}],
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider_for(&server)
            .embed(EmbeddingModel::TextEmbedding3Small, "hello world")
            .await
            .unwrap();

        assert_eq!(result.dimension, 1536);
        assert_eq!(result.values.len(), 1536);
        assert_eq!(result.values[0], 0.25);
        assert_eq!(result.tokens_used, 2);
    }

    #[tokio::test]
    async fn test_embed_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .embed(EmbeddingModel::TextEmbedding3Small, "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Embedding(_)));
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_embed_empty_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .embed(EmbeddingModel::TextEmbedding3Small, "hello")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("No embedding returned"));
    }

    #[tokio::test]
    async fn test_embed_rejects_empty_text_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .embed(EmbeddingModel::TextEmbedding3Small, "   ")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Embedding(_)));
    }

    #[test]
    fn test_new_rejects_blank_key() {
        let result = OpenAIProvider::new(OpenAIConfig::new("  ".to_string()));
        assert!(matches!(result, Err(IngestError::ClientInit(_))));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = OpenAIConfig::new("sk".to_string())
            .with_base_url("http://localhost:8080/v1/".to_string());
        let provider = OpenAIProvider::new(config).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
    }

    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("OPENAI_API_KEY", Some("sk-env")),
                ("OPENAI_BASE_URL", None::<&str>),
            ],
            || {
                let config = OpenAIConfig::from_env().unwrap();
                assert_eq!(config.api_key, "sk-env");
                assert_eq!(config.base_url, "https://api.openai.com/v1");
            },
        );
    }

    #[test]
    fn test_config_from_env_missing_key() {
        temp_env::with_var_unset("OPENAI_API_KEY", || {
            let err = OpenAIConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("OPENAI_API_KEY"));
        });
    }
}
