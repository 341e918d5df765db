//! In-memory vector store with brute-force cosine search.

use super::{cosine_similarity, ChunkRecord, VectorStore};
use crate::types::{Chunk, CorpusStats, FilterSet};
use nss_core::AppResult;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// Test double holding every record in a vector.
///
/// Backs the pipeline and HTTP tests; production uses [`super::LanceDbStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ChunkRecord>>,
}

impl MemoryStore {
    pub fn new(records: Vec<ChunkRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(
        &self,
        embedding: &[f32],
        filters: &FilterSet,
        limit: usize,
    ) -> AppResult<Vec<Chunk>> {
        let records = self.records.read().await;

        let mut scored: Vec<Chunk> = records
            .iter()
            .filter(|r| filters.matches(&r.country, r.year))
            .map(|r| r.to_chunk(cosine_similarity(embedding, &r.embedding)))
            .collect();

        scored.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn latest_year(&self, country: Option<&str>) -> AppResult<Option<i32>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| country.map_or(true, |c| r.country == c))
            .map(|r| r.year)
            .max())
    }

    async fn stats(&self) -> AppResult<CorpusStats> {
        let records = self.records.read().await;

        let mut index: BTreeMap<String, BTreeSet<i32>> = BTreeMap::new();
        for record in records.iter() {
            index
                .entry(record.country.clone())
                .or_default()
                .insert(record.year);
        }

        Ok(CorpusStats::from_country_years(records.len(), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(country: &str, year: i32, page: i32, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            text: format!("{} {} page {}", country, year, page),
            country: country.to_string(),
            year,
            doc_name: format!("{}_{}_NSS", country, year),
            page,
            embedding,
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            record("United States", 2017, 1, vec![0.0, 1.0]),
            record("United States", 2022, 4, vec![0.6, 0.8]),
            record("United States", 2025, 10, vec![1.0, 0.0]),
            record("Japan", 2022, 2, vec![0.9, 0.1]),
        ])
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity_and_limits() {
        let results = store()
            .search(&[1.0, 0.0], &FilterSet::default(), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].year, 2025);
        assert_eq!(results[1].country, "Japan");
        assert!(results[0].similarity_score >= results[1].similarity_score);
    }

    #[tokio::test]
    async fn test_search_pushes_down_filters() {
        let filters = FilterSet {
            country: Some("United States".to_string()),
            year_min: Some(2017),
            year_max: Some(2022),
        };
        let results = store().search(&[1.0, 0.0], &filters, 10).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|c| c.country == "United States" && c.year <= 2022));
    }

    #[tokio::test]
    async fn test_latest_year() {
        let store = store();
        assert_eq!(store.latest_year(Some("United States")).await.unwrap(), Some(2025));
        assert_eq!(store.latest_year(Some("Japan")).await.unwrap(), Some(2022));
        assert_eq!(store.latest_year(Some("Mali")).await.unwrap(), None);
        assert_eq!(store.latest_year(None).await.unwrap(), Some(2025));
    }

    #[tokio::test]
    async fn test_stats() {
        let mut records = vec![record("Mali", 2021, 1, vec![0.5, 0.5])];
        records.extend(store().records.into_inner());
        let store = MemoryStore::new(records);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 5);
        assert_eq!(stats.country_list, vec!["Japan", "Mali", "United States"]);
        assert_eq!(stats.years, vec![2017, 2021, 2022, 2025]);
        assert_eq!(stats.country_years["United States"], vec![2017, 2022, 2025]);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryStore::default();
        assert_eq!(store.latest_year(None).await.unwrap(), None);
        assert_eq!(store.stats().await.unwrap().year_range, None);
    }
}
