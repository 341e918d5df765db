//! OpenAI-compatible embeddings provider (OpenAI, OpenRouter).
//!
//! `POST {endpoint}/embeddings` with `{"model", "input": [...]}`; the whole
//! batch goes out in one request.

use super::http_client;
use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::{check_dimensions, EmbeddingProvider};
use nss_core::config::{OPENAI_ENDPOINT, OPENROUTER_ENDPOINT};
use nss_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings over an OpenAI-compatible HTTP API.
pub struct OpenAiProvider {
    provider: String,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        let default_endpoint = if config.provider == "openai" {
            OPENAI_ENDPOINT
        } else {
            OPENROUTER_ENDPOINT
        };
        let base_url = config
            .endpoint
            .as_deref()
            .unwrap_or(default_endpoint)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            provider: config.provider.clone(),
            base_url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            client: http_client(&config.provider, config.timeout_secs)?,
        })
    }

    /// Order vectors by the response's `index` field.
    fn into_ordered(&self, mut response: EmbeddingResponse, expected: usize) -> AppResult<Vec<Vec<f32>>> {
        if response.data.len() != expected {
            return Err(AppError::Embedding(format!(
                "{} returned {} embeddings for {} inputs",
                self.provider,
                response.data.len(),
                expected
            )));
        }

        response.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        check_dimensions(&self.provider, self.dimensions, &embeddings)?;
        Ok(embeddings)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = %self.provider, model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::Embedding("Cannot embed empty text".to_string()));
        }

        let url = format!("{}/embeddings", self.base_url);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                AppError::Embedding(format!("Failed to send request to {}: {}", self.provider, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "{} embeddings API error ({}): {}",
                self.provider, status, error_text
            )));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Embedding(format!(
                "Failed to parse {} embeddings response: {}",
                self.provider, e
            ))
        })?;

        self.into_ordered(body, texts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dimensions: usize) -> OpenAiProvider {
        let config = EmbeddingConfig {
            provider: "openrouter".to_string(),
            model: "openai/text-embedding-3-small".to_string(),
            dimensions,
            endpoint: None,
            api_key: None,
            timeout_secs: 5,
        };
        OpenAiProvider::new(&config, "sk-or-test").unwrap()
    }

    #[test]
    fn test_defaults_to_openrouter_endpoint() {
        let p = provider(3);
        assert_eq!(p.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(p.model_name(), "openai/text-embedding-3-small");
    }

    #[test]
    fn test_request_body_shape() {
        let input = vec!["cyber threats".to_string()];
        let body = serde_json::to_value(EmbeddingRequest {
            model: "m",
            input: &input,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"model": "m", "input": ["cyber threats"]}));
    }

    #[test]
    fn test_response_is_reordered_by_index() {
        let raw = r#"{"data": [
            {"index": 1, "embedding": [0.0, 1.0, 0.0]},
            {"index": 0, "embedding": [1.0, 0.0, 0.0]}
        ]}"#;
        let body: EmbeddingResponse = serde_json::from_str(raw).unwrap();
        let ordered = provider(3).into_ordered(body, 2).unwrap();
        assert_eq!(ordered[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(ordered[1], vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_dimension_mismatch_is_an_embedding_error() {
        let body: EmbeddingResponse =
            serde_json::from_str(r#"{"data": [{"index": 0, "embedding": [1.0, 0.0]}]}"#).unwrap();
        let err = provider(3).into_ordered(body, 1).unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }

    #[test]
    fn test_missing_vectors_are_an_error() {
        let body: EmbeddingResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(provider(3).into_ordered(body, 1).is_err());
    }

    #[test]
    fn test_debug_hides_api_key() {
        assert!(!format!("{:?}", provider(3)).contains("sk-or-test"));
    }
}
