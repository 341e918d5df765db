//! LLM provider factory.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use nss_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client for `provider`.
///
/// # Arguments
/// * `provider` - Provider identifier ("openrouter", "openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by the hosted providers
/// * `timeout_secs` - Per-request HTTP timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key
/// is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout_secs: u64,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;
    let endpoint = endpoint.unwrap_or(provider_type.default_endpoint());

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(endpoint, timeout_secs)?)),
        ProviderType::OpenRouter | ProviderType::OpenAI => {
            let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "{} provider requires API key",
                    provider_type.as_str()
                ))
            })?;
            Ok(Arc::new(OpenAiClient::new(
                provider_type.as_str(),
                endpoint,
                api_key,
                timeout_secs,
            )?))
        }
    }
}
