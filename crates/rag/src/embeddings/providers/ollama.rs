//! Ollama embedding provider.
//!
//! Uses the local `/api/embeddings` endpoint, one request per text.

use super::http_client;
use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::{check_dimensions, EmbeddingProvider};
use nss_core::config::OLLAMA_ENDPOINT;
use nss_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

#[derive(Debug, Clone, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> AppResult<Self> {
        Ok(Self {
            client: http_client("ollama", config.timeout_secs)?,
            base_url: config
                .endpoint
                .as_deref()
                .unwrap_or(OLLAMA_ENDPOINT)
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to send request to Ollama: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(AppError::Embedding(format!(
                "Ollama API error ({}): {}",
                status, message
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(body.embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());

        for text in texts {
            if text.trim().is_empty() {
                return Err(AppError::Embedding("Cannot embed empty text".to_string()));
            }
            embeddings.push(self.embed_single(text).await?);
        }

        check_dimensions("ollama", self.dimensions, &embeddings)?;
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            endpoint: endpoint.map(str::to_string),
            api_key: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_endpoint_defaults_and_trailing_slash() {
        assert_eq!(OllamaProvider::new(&config(None)).unwrap().base_url, OLLAMA_ENDPOINT);
        assert_eq!(
            OllamaProvider::new(&config(Some("http://gpu:11434/")))
                .unwrap()
                .base_url,
            "http://gpu:11434"
        );
    }

    #[tokio::test]
    async fn test_empty_text_fails_before_any_request() {
        // Port 9 (discard) is never an Ollama server; the check must fire first
        let provider = OllamaProvider::new(&config(Some("http://127.0.0.1:9"))).unwrap();
        let err = provider.embed("   ").await.unwrap_err();
        assert!(err.to_string().contains("Cannot embed empty text"));
    }

    #[tokio::test]
    async fn test_empty_batch_is_ok() {
        let provider = OllamaProvider::new(&config(None)).unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
