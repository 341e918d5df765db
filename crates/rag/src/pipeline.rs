//! Query pipeline orchestration.
//!
//! interpret, resolve filters, retrieve, synthesize: strictly in that order,
//! one tracing span per stage.

use crate::embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use crate::filters::FilterResolver;
use crate::interpret::QueryInterpreter;
use crate::retrieve::Retriever;
use crate::store::{LanceDbStore, VectorStore};
use crate::synthesize::AnswerSynthesizer;
use crate::types::{AnswerResult, CorpusStats};
use nss_core::{AppConfig, AppError, AppResult};
use nss_llm::{create_client, LlmClient};
use nss_prompt::{load_prompt, INTERPRET_PROMPT_ID, SYNTHESIZE_PROMPT_ID};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// The four-stage question answering pipeline.
///
/// Holds no per-request state; one instance can serve concurrent requests.
pub struct QueryPipeline {
    interpreter: QueryInterpreter,
    resolver: FilterResolver,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl QueryPipeline {
    /// Assemble a pipeline from explicit collaborators.
    ///
    /// Prompts are loaded from the workspace override directory, falling back
    /// to the built-in definitions.
    pub fn new(
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> AppResult<Self> {
        let prompts_dir = config.prompts_dir();
        let (interpret_prompt, interpret_source) = load_prompt(&prompts_dir, INTERPRET_PROMPT_ID)?;
        let (synthesize_prompt, synthesize_source) =
            load_prompt(&prompts_dir, SYNTHESIZE_PROMPT_ID)?;
        tracing::debug!(
            ?interpret_source,
            ?synthesize_source,
            "Loaded pipeline prompts"
        );

        let pipeline = &config.pipeline;
        Ok(Self {
            interpreter: QueryInterpreter::new(
                llm.clone(),
                config.model.clone(),
                interpret_prompt,
                pipeline.countries.clone(),
            ),
            resolver: FilterResolver::new(store.clone(), pipeline.latest_scope),
            retriever: Retriever::new(embedder, store.clone(), pipeline.overfetch_factor),
            synthesizer: AnswerSynthesizer::new(llm, config.model.clone(), synthesize_prompt),
            store,
            top_k: pipeline.top_k,
        })
    }

    /// Build the production pipeline: configured LLM, embeddings and LanceDB store.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let llm = create_client(
            &config.provider,
            config.endpoint_for(&config.provider).as_deref(),
            config.resolve_api_key(&config.provider).as_deref(),
            config.timeout_for(&config.provider),
        )?;
        let embedder = create_provider(&EmbeddingConfig::from_app_config(config))?;
        let store = LanceDbStore::open(
            &config.store_path(),
            &config.store.table,
            config.store.embedding_dim,
        )
        .await?;

        info!(
            provider = %llm.provider_name(),
            model = %config.model,
            embedding_provider = %embedder.provider_name(),
            embedding_model = %embedder.model_name(),
            store = ?config.store_path(),
            "Query pipeline ready"
        );

        Self::new(config, llm, embedder, Arc::new(store))
    }

    /// Configured number of passages per answer.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer a question with the configured `top_k`.
    pub async fn answer(&self, raw_query: &str) -> AppResult<AnswerResult> {
        self.answer_with_top_k(raw_query, self.top_k).await
    }

    /// Answer a question using at most `top_k` passages.
    pub async fn answer_with_top_k(&self, raw_query: &str, top_k: usize) -> AppResult<AnswerResult> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidQuery("Query cannot be empty".to_string()));
        }

        info!("Answering query: {}", query);

        let interpretation = self
            .interpreter
            .interpret(query)
            .instrument(info_span!("interpret"))
            .await?;
        let interpretation_degraded = interpretation.is_fallback();
        let intent = interpretation.into_intent();

        let filters = self
            .resolver
            .resolve(&intent)
            .instrument(info_span!("resolve_filters"))
            .await?;
        info!(?filters, "Resolved filters");

        let chunks = self
            .retriever
            .retrieve(&intent.search_query, &filters, top_k)
            .instrument(info_span!("retrieve"))
            .await?;

        let synthesis = self
            .synthesizer
            .synthesize(query, &chunks)
            .instrument(info_span!("synthesize"))
            .await?;

        info!(
            chunks = chunks.len(),
            sources = synthesis.sources.len(),
            interpretation_degraded,
            "Answered query"
        );

        Ok(AnswerResult {
            answer: synthesis.answer,
            sources: synthesis.sources,
            parsed_query: intent,
            filters,
            interpretation_degraded,
            chunks_retrieved: chunks.len(),
        })
    }

    /// Corpus summary straight from the store.
    pub async fn stats(&self) -> AppResult<CorpusStats> {
        self.store.stats().instrument(info_span!("stats")).await
    }
}
