//! Test doubles for the pipeline's outbound calls.

use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::{Chunk, CorpusStats, FilterSet};
use nss_core::{AppConfig, AppError, AppResult};
use nss_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

pub const ANSWER: &str = "The 2025 strategy names China as the pacing challenge (United States, 2025).";

/// Config rooted in an empty temporary workspace.
pub fn test_config() -> (TempDir, AppConfig) {
    let temp = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.workspace = temp.path().to_path_buf();
    (temp, config)
}

pub fn chunk(country: &str, year: i32, doc_name: &str, page: i32, score: f32, text: &str) -> Chunk {
    Chunk {
        text: text.to_string(),
        country: country.to_string(),
        year,
        doc_name: doc_name.to_string(),
        page,
        similarity_score: score,
    }
}

/// Answers parser prompts with `intent_json` and everything else with [`ANSWER`].
pub struct RoutingLlm {
    intent_json: String,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl RoutingLlm {
    pub fn new(intent_json: &str) -> Self {
        Self {
            intent_json: intent_json.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn is_parser_request(request: &LlmRequest) -> bool {
        request
            .system
            .as_deref()
            .is_some_and(|s| s.starts_with("You are a query parser"))
    }

    pub fn interpret_calls(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| Self::is_parser_request(r))
            .count()
    }

    pub fn answer_requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !Self::is_parser_request(r))
            .cloned()
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for RoutingLlm {
    fn provider_name(&self) -> &str {
        "routing"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let content = if Self::is_parser_request(request) {
            self.intent_json.clone()
        } else {
            ANSWER.to_string()
        };
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::new(20, 40),
        })
    }
}

pub struct FailingLlm;

#[async_trait::async_trait]
impl LlmClient for FailingLlm {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm("openrouter API error (503): overloaded".to_string()))
    }
}

/// Returns the same unit vector for every text and counts calls.
#[derive(Debug, Default)]
pub struct FixedEmbedder {
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "fixed-4"
    }

    fn dimensions(&self) -> usize {
        4
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
    }
}

#[derive(Debug)]
pub struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        "failing"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        4
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Embedding("embedding endpoint timed out".to_string()))
    }
}

/// Store returning canned candidates whatever the filters, so the
/// retriever's own filtering is what the tests observe.
pub struct ScriptedStore {
    years: Vec<(String, i32)>,
    candidates: Vec<Chunk>,
    pub searches: Mutex<Vec<(FilterSet, usize)>>,
}

impl ScriptedStore {
    pub fn new(years: &[(&str, i32)], candidates: Vec<Chunk>) -> Self {
        Self {
            years: years.iter().map(|(c, y)| (c.to_string(), *y)).collect(),
            candidates,
            searches: Mutex::new(Vec::new()),
        }
    }

    pub fn searches(&self) -> Vec<(FilterSet, usize)> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VectorStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search(
        &self,
        _embedding: &[f32],
        filters: &FilterSet,
        limit: usize,
    ) -> AppResult<Vec<Chunk>> {
        self.searches.lock().unwrap().push((filters.clone(), limit));
        Ok(self.candidates.iter().take(limit).cloned().collect())
    }

    async fn latest_year(&self, country: Option<&str>) -> AppResult<Option<i32>> {
        Ok(self
            .years
            .iter()
            .filter(|(c, _)| country.map_or(true, |wanted| c == wanted))
            .map(|(_, y)| *y)
            .max())
    }

    async fn stats(&self) -> AppResult<CorpusStats> {
        let mut index: BTreeMap<String, BTreeSet<i32>> = BTreeMap::new();
        for (country, year) in &self.years {
            index.entry(country.clone()).or_default().insert(*year);
        }
        Ok(CorpusStats::from_country_years(self.candidates.len(), index))
    }
}

pub struct FailingStore;

#[async_trait::async_trait]
impl VectorStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn search(
        &self,
        _embedding: &[f32],
        _filters: &FilterSet,
        _limit: usize,
    ) -> AppResult<Vec<Chunk>> {
        Err(AppError::Store("Failed to execute search: table missing".to_string()))
    }

    async fn latest_year(&self, _country: Option<&str>) -> AppResult<Option<i32>> {
        Err(AppError::Store("Failed to count rows: table missing".to_string()))
    }

    async fn stats(&self) -> AppResult<CorpusStats> {
        Err(AppError::Store("Failed to count rows: table missing".to_string()))
    }
}
