//! Filtered semantic retrieval.

use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::{Chunk, FilterSet};
use nss_core::AppResult;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Embeds the search query and ranks store candidates.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    overfetch_factor: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        overfetch_factor: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            overfetch_factor: overfetch_factor.max(1),
        }
    }

    /// Top `top_k` distinct pages for `search_query` within `filters`.
    #[instrument(skip(self, search_query), fields(store = %self.store.name()))]
    pub async fn retrieve(
        &self,
        search_query: &str,
        filters: &FilterSet,
        top_k: usize,
    ) -> AppResult<Vec<Chunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(search_query).await?;

        let limit = top_k.saturating_mul(self.overfetch_factor);
        let candidates = self.store.search(&embedding, filters, limit).await?;
        debug!("Store returned {} candidates (limit {})", candidates.len(), limit);

        Ok(rank_candidates(candidates, filters, top_k))
    }
}

/// Hard-filter, deduplicate by page keeping the best score, sort and truncate.
///
/// Ties are broken by `doc_name` then `page`; among duplicates with equal
/// scores the first candidate wins.
pub fn rank_candidates(candidates: Vec<Chunk>, filters: &FilterSet, top_k: usize) -> Vec<Chunk> {
    let mut best: HashMap<(String, i32), Chunk> = HashMap::with_capacity(candidates.len());

    for chunk in candidates.into_iter().filter(|c| filters.matches_chunk(c)) {
        match best.entry((chunk.doc_name.clone(), chunk.page)) {
            Entry::Occupied(mut current) => {
                if chunk.similarity_score > current.get().similarity_score {
                    current.insert(chunk);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(chunk);
            }
        }
    }

    let mut ranked: Vec<Chunk> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| a.doc_name.cmp(&b.doc_name))
            .then_with(|| a.page.cmp(&b.page))
    });
    ranked.truncate(top_k);
    ranked
}
