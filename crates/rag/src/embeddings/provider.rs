//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{MockProvider, OllamaProvider, OpenAiProvider};
use nss_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openrouter", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(config.dimensions))),

        "openrouter" | "openai" => {
            let api_key = config.api_key.as_deref().ok_or_else(|| {
                AppError::Config(format!(
                    "Embedding provider '{}' requires an API key",
                    config.provider
                ))
            })?;
            Ok(Arc::new(OpenAiProvider::new(config, api_key)?))
        }

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: openrouter, openai, ollama, mock",
            config.provider
        ))),
    }
}

/// Reject vectors whose length differs from the configured dimensionality.
pub(crate) fn check_dimensions(
    provider: &str,
    expected: usize,
    embeddings: &[Vec<f32>],
) -> AppResult<()> {
    match embeddings.iter().find(|e| e.len() != expected) {
        Some(bad) => Err(AppError::Embedding(format!(
            "{} returned {} dimensions, expected {}",
            provider,
            bad.len(),
            expected
        ))),
        None => Ok(()),
    }
}
