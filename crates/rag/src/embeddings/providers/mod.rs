//! Embedding provider implementations.

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use nss_core::{AppError, AppResult};
use std::time::Duration;

pub(crate) fn http_client(provider: &str, timeout_secs: u64) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| {
            AppError::Config(format!(
                "Failed to create HTTP client for {}: {}",
                provider, e
            ))
        })
}
