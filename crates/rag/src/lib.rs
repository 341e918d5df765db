//! Retrieval-augmented question answering over National Security Strategy documents.
//!
//! A question goes through four stages:
//! 1. [`interpret`]: the LLM extracts country, year and topic
//! 2. [`filters`]: "latest" and year bounds are resolved against the corpus
//! 3. [`retrieve`]: filtered vector search with page-level deduplication
//! 4. [`synthesize`]: the LLM answers from the excerpts, with citations
//!
//! [`QueryPipeline`] wires them together.

pub mod embeddings;
pub mod filters;
pub mod interpret;
pub mod pipeline;
pub mod retrieve;
pub mod store;
pub mod synthesize;
pub mod types;

#[cfg(test)]
mod tests;

pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use filters::FilterResolver;
pub use interpret::{parse_intent, Interpretation, QueryInterpreter};
pub use pipeline::QueryPipeline;
pub use retrieve::{rank_candidates, Retriever};
pub use store::{ChunkRecord, LanceDbStore, MemoryStore, VectorStore};
pub use synthesize::{AnswerSynthesizer, Synthesis, NO_RESULTS_ANSWER};
pub use types::{AnswerResult, Chunk, CorpusStats, FilterSet, ParsedIntent, SourceCitation};
