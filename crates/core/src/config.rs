//! Configuration management for the NSS query pipeline.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.nss/config.yaml` in the workspace, or `NSS_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The resulting [`AppConfig`] is passed explicitly to every component that
//! needs it; nothing reads process-wide state after startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default OpenRouter endpoint (OpenAI-compatible API).
pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1";

/// Default OpenAI endpoint.
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default Ollama endpoint.
pub const OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Providers that can serve chat completions.
pub const KNOWN_PROVIDERS: &[&str] = &["openrouter", "openai", "ollama"];

/// Providers that can serve embeddings.
pub const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["openrouter", "openai", "ollama", "mock"];

/// Countries with NSS documents in the reference corpus.
pub const DEFAULT_COUNTRIES: &[&str] = &[
    "United States",
    "United Kingdom",
    "China",
    "Russia",
    "Japan",
    "Spain",
    "Germany",
    "France",
    "Australia",
    "Canada",
    "India",
    "Taiwan",
    "Netherlands",
    "Sweden",
    "Jamaica",
    "South Korea",
    "Israel",
    "Singapore",
    "Brazil",
    "Mexico",
    "Poland",
    "Italy",
];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .nss/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat-completion provider ("openrouter", "openai", "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Embedding provider ("openrouter", "openai", "ollama", "mock")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Explicit API key, taking precedence over provider key variables
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider table from config.yaml
    pub llm: Option<LlmConfig>,

    pub store: StoreConfig,

    pub pipeline: PipelineConfig,

    pub server: ServerConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    #[serde(rename = "activeEmbeddingProvider")]
    pub active_embedding_provider: Option<String>,

    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    /// Any OpenAI-compatible HTTP API (OpenAI, OpenRouter).
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenAI { model, .. } | ProviderConfig::Ollama { model, .. } => model,
        }
    }

    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI {
                embedding_model, ..
            }
            | ProviderConfig::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenAI { endpoint, .. } => endpoint.as_deref(),
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint),
        }
    }

    pub fn timeout(&self) -> Option<u64> {
        match self {
            ProviderConfig::OpenAI { timeout, .. } | ProviderConfig::Ollama { timeout, .. } => {
                *timeout
            }
        }
    }
}

/// Location and shape of the persisted vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Store directory; relative paths resolve against the workspace
    pub path: PathBuf,

    /// Table (collection) holding the NSS chunks
    pub table: String,

    /// Expected embedding dimensionality
    pub embedding_dim: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("nss_db"),
            table: "nss_documents".to_string(),
            embedding_dim: 1536,
        }
    }
}

/// Which documents "latest" is computed over when the question names no
/// country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatestScope {
    /// Use the newest year across the whole corpus.
    #[default]
    Global,
    /// Only resolve "latest" when a country is known.
    CountryOnly,
}

/// Query pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Number of passages handed to the answer synthesizer
    pub top_k: usize,

    /// Candidates requested from the store per kept passage
    pub overfetch_factor: usize,

    pub latest_scope: LatestScope,

    /// Canonical country names the interpreter normalizes to
    pub countries: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            overfetch_factor: 3,
            latest_scope: LatestScope::Global,
            countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// HTTP server bind settings for `nss serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    store: Option<StoreConfig>,
    pipeline: Option<PipelineConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openrouter".to_string(),
            model: "anthropic/claude-3.5-sonnet".to_string(),
            embedding_provider: "openrouter".to_string(),
            embedding_model: "openai/text-embedding-3-small".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            store: StoreConfig::default(),
            pipeline: PipelineConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `NSS_WORKSPACE`: Override workspace path
    /// - `NSS_CONFIG`: Path to config file
    /// - `NSS_PROVIDER`: Chat provider
    /// - `NSS_MODEL`: Chat model identifier
    /// - `NSS_EMBEDDING_PROVIDER`: Embedding provider
    /// - `NSS_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use nss_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Store: {:?}", config.store_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with the workspace and config file chosen
    /// up front so the right YAML file is merged.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var("NSS_WORKSPACE").ok().map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var("NSS_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.nss_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("NSS_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("NSS_MODEL") {
            config.model = model;
        }

        if let Ok(provider) = std::env::var("NSS_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }

        if let Ok(key) = std::env::var("NSS_API_KEY") {
            config.api_key = Some(key);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(self, contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to unit, not to a map
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self;

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(store) = config_file.store {
            result.store = store;
        }

        if let Some(pipeline) = config_file.pipeline {
            result.pipeline = pipeline;
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();
            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
            }

            let embedding_provider = llm
                .active_embedding_provider
                .clone()
                .unwrap_or_else(|| llm.active_provider.clone());
            if let Some(model) = llm
                .providers
                .get(&embedding_provider)
                .and_then(|p| p.embedding_model())
            {
                result.embedding_model = model.to_string();
            }
            result.embedding_provider = embedding_provider;

            result.llm = Some(llm);
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config
    /// file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        store_path: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(store_path) = store_path {
            self.store.path = store_path;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Path to the .nss directory.
    pub fn nss_dir(&self) -> PathBuf {
        self.workspace.join(".nss")
    }

    /// Directory holding prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.nss_dir().join("prompts")
    }

    /// Resolved vector store directory.
    pub fn store_path(&self) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            self.workspace.join(&self.store.path)
        }
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint for a provider, from config or the provider's default.
    pub fn endpoint_for(&self, provider: &str) -> Option<String> {
        if let Some(endpoint) = self.get_provider_config(provider).and_then(|p| p.endpoint()) {
            return Some(endpoint.to_string());
        }

        match provider {
            "openrouter" => Some(OPENROUTER_ENDPOINT.to_string()),
            "openai" => Some(OPENAI_ENDPOINT.to_string()),
            "ollama" => Some(OLLAMA_ENDPOINT.to_string()),
            _ => None,
        }
    }

    /// HTTP timeout in seconds for calls to a provider.
    pub fn timeout_for(&self, provider: &str) -> u64 {
        self.get_provider_config(provider)
            .and_then(|p| p.timeout())
            .unwrap_or(120)
    }

    /// Name of the environment variable holding a provider's API key.
    fn api_key_env(&self, provider: &str) -> Option<String> {
        match self.get_provider_config(provider) {
            Some(ProviderConfig::OpenAI { api_key_env, .. }) => Some(api_key_env.clone()),
            Some(ProviderConfig::Ollama { .. }) => None,
            None => match provider {
                "openrouter" => Some("OPENROUTER_API_KEY".to_string()),
                "openai" => Some("OPENAI_API_KEY".to_string()),
                _ => None,
            },
        }
    }

    /// Resolve the API key for a provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        self.api_key_env(provider)
            .and_then(|env_var| std::env::var(env_var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration before any component is built.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        for provider in [&self.provider, &self.embedding_provider] {
            if let Some(env_var) = self.api_key_env(provider) {
                if self.resolve_api_key(provider).is_none() {
                    return Err(AppError::Config(format!(
                        "API key for provider '{}' not found in environment variable: {}",
                        provider, env_var
                    )));
                }
            }
        }

        if self.pipeline.top_k == 0 {
            return Err(AppError::Config("pipeline.topK must be at least 1".to_string()));
        }

        if self.pipeline.overfetch_factor == 0 {
            return Err(AppError::Config(
                "pipeline.overfetchFactor must be at least 1".to_string(),
            ));
        }

        if self.store.embedding_dim == 0 {
            return Err(AppError::Config(
                "store.embeddingDim must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
