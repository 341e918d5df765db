//! Grounded answer generation with citations.

use crate::interpret::llm_request;
use crate::types::{Chunk, SourceCitation};
use nss_core::AppResult;
use nss_llm::LlmClient;
use nss_prompt::{build_prompt, PromptDefinition};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Answer returned when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str = "No relevant documents found for your query. Try broadening your search or checking the country/year filters.";

/// Answer text plus the pages it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

/// Answers from retrieved excerpts via the `nss.synthesize` prompt.
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
        }
    }

    /// Answer `query` from `chunks`.
    ///
    /// Without chunks the fixed no-results answer is returned and the model
    /// is not called.
    #[instrument(skip(self, query, chunks), fields(chunks = chunks.len(), model = %self.model))]
    pub async fn synthesize(&self, query: &str, chunks: &[Chunk]) -> AppResult<Synthesis> {
        if chunks.is_empty() {
            debug!("No chunks retrieved, skipping synthesis");
            return Ok(Synthesis {
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("context".to_string(), format_context(chunks));

        let built = build_prompt(&self.prompt, &variables)?;
        let response = self.llm.complete(&llm_request(built, &self.model)).await?;
        debug!(output = %response.content, "Synthesizer model output");

        Ok(Synthesis {
            answer: response.content,
            sources: collect_sources(chunks),
        })
    }
}

/// Numbered excerpt blocks separated by `---`.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Source {}: {} {}, {} p.{}]\n{}",
                i + 1,
                chunk.country,
                chunk.year,
                chunk.doc_name,
                chunk.page,
                chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// One citation per `(doc_name, page)`, in first-seen order.
pub fn collect_sources(chunks: &[Chunk]) -> Vec<SourceCitation> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for chunk in chunks {
        if seen.insert(chunk.page_key()) {
            sources.push(SourceCitation::from(chunk));
        }
    }
    sources
}
