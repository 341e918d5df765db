//! Embedding provider settings derived from the application config.

use nss_core::AppConfig;

/// Everything needed to build an [`EmbeddingProvider`](super::EmbeddingProvider).
#[derive(Clone)]
pub struct EmbeddingConfig {
    /// Provider name: "openrouter", "openai", "ollama" or "mock"
    pub provider: String,

    pub model: String,

    /// Vector length; must match the store's embedding column
    pub dimensions: usize,

    /// Override for the provider's default endpoint
    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    pub timeout_secs: u64,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EmbeddingConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let provider = config.embedding_provider.clone();
        Self {
            model: config.embedding_model.clone(),
            dimensions: config.store.embedding_dim,
            endpoint: config.endpoint_for(&provider),
            api_key: config.resolve_api_key(&provider),
            timeout_secs: config.timeout_for(&provider),
            provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config_uses_store_dimensions() {
        let mut app = AppConfig::default();
        app.embedding_provider = "mock".to_string();
        app.store.embedding_dim = 384;

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.provider, "mock");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut app = AppConfig::default();
        app.api_key = Some("sk-or-secret".to_string());

        let config = EmbeddingConfig::from_app_config(&app);
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-or-secret"));
        assert!(printed.contains("<redacted>"));
    }
}
