//! Vector store abstraction over the document corpus.
//!
//! The corpus is populated out of band; stores here only read it.

pub mod lance;
pub mod memory;

pub use lance::LanceDbStore;
pub use memory::MemoryStore;

use crate::types::{Chunk, CorpusStats, FilterSet};
use nss_core::AppResult;

/// Trait for vector store backends.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Nearest passages to `embedding` satisfying `filters`.
    ///
    /// Returns at most `limit` chunks ordered by descending similarity.
    /// Backends may return duplicates of the same document page.
    async fn search(
        &self,
        embedding: &[f32],
        filters: &FilterSet,
        limit: usize,
    ) -> AppResult<Vec<Chunk>>;

    /// Maximum `year` among documents of `country`, or across the whole
    /// corpus when `country` is `None`.
    async fn latest_year(&self, country: Option<&str>) -> AppResult<Option<i32>>;

    /// Summary of the corpus contents.
    async fn stats(&self) -> AppResult<CorpusStats>;
}

/// One stored passage with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub text: String,
    pub country: String,
    pub year: i32,
    pub doc_name: String,
    pub page: i32,
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub(crate) fn to_chunk(&self, similarity_score: f32) -> Chunk {
        Chunk {
            text: self.text.clone(),
            country: self.country.clone(),
            year: self.year,
            doc_name: self.doc_name.clone(),
            page: self.page,
            similarity_score,
        }
    }
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
