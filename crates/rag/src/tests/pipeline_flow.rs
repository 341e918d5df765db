//! Pipeline scenarios from question to answer.

use super::support::*;
use crate::pipeline::QueryPipeline;
use crate::store::{ChunkRecord, MemoryStore, VectorStore};
use crate::synthesize::NO_RESULTS_ANSWER;
use crate::types::{FilterSet, ParsedIntent};
use nss_core::{AppError, LatestScope};
use std::sync::Arc;

const US_YEARS: &[(&str, i32)] = &[
    ("United States", 2017),
    ("United States", 2022),
    ("United States", 2025),
    ("Japan", 2022),
];

const LATEST_US_INTENT: &str = r#"{"country": "United States", "year": null, "year_min": null,
    "year_max": null, "wants_latest": true, "search_query": "China"}"#;

fn us_candidates() -> Vec<crate::types::Chunk> {
    vec![
        chunk("United States", 2022, "us_2022_NSS", 8, 0.93, "Outcompete China (2022)."),
        chunk("United States", 2025, "us_2025_NSS", 10, 0.81, "China is the pacing challenge."),
        chunk("United States", 2025, "us_2025_NSS", 12, 0.77, "Deter aggression in the Indo-Pacific."),
        chunk("Japan", 2025, "japan_2025", 3, 0.90, "Japan text."),
    ]
}

struct Harness {
    _temp: tempfile::TempDir,
    llm: Arc<RoutingLlm>,
    embedder: Arc<FixedEmbedder>,
    store: Arc<ScriptedStore>,
    pipeline: QueryPipeline,
}

fn harness(intent_json: &str, candidates: Vec<crate::types::Chunk>) -> Harness {
    let (temp, config) = test_config();
    let llm = Arc::new(RoutingLlm::new(intent_json));
    let embedder = Arc::new(FixedEmbedder::default());
    let store = Arc::new(ScriptedStore::new(US_YEARS, candidates));
    let pipeline =
        QueryPipeline::new(&config, llm.clone(), embedder.clone(), store.clone()).unwrap();

    Harness {
        _temp: temp,
        llm,
        embedder,
        store,
        pipeline,
    }
}

#[tokio::test]
async fn test_latest_country_question_uses_newest_document() {
    let h = harness(LATEST_US_INTENT, us_candidates());

    let result = h
        .pipeline
        .answer("What does the latest US strategy say about China?")
        .await
        .unwrap();

    assert_eq!(
        result.filters,
        FilterSet {
            country: Some("United States".to_string()),
            year_min: Some(2025),
            year_max: Some(2025),
        }
    );
    assert_eq!(result.parsed_query.search_query, "China");
    assert!(result.parsed_query.wants_latest);
    assert_eq!(result.answer, ANSWER);
    assert!(!result.interpretation_degraded);

    assert_eq!(result.sources.len(), 2);
    assert!(result
        .sources
        .iter()
        .all(|s| s.country == "United States" && s.year == 2025));
    assert_eq!(result.sources[0].page, 10);

    // Default top_k 10 with overfetch 3
    let searches = h.store.searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].0, result.filters);
    assert_eq!(searches[0].1, 30);

    // The synthesizer sees the raw question, not the rewritten search query
    let answers = h.llm.answer_requests();
    assert_eq!(answers.len(), 1);
    assert!(answers[0]
        .prompt
        .contains("**Question:** What does the latest US strategy say about China?"));
}

#[tokio::test]
async fn test_country_without_documents_returns_no_results_without_answer_call() {
    let h = harness(
        r#"{"country": "Mali", "wants_latest": false, "search_query": "terrorism"}"#,
        us_candidates(),
    );

    let result = h.pipeline.answer("Mali terrorism policy").await.unwrap();

    assert_eq!(result.filters.country.as_deref(), Some("Mali"));
    assert_eq!(result.answer, NO_RESULTS_ANSWER);
    assert!(result.sources.is_empty());
    assert_eq!(result.chunks_retrieved, 0);
    assert_eq!(h.llm.interpret_calls(), 1);
    assert!(h.llm.answer_requests().is_empty());
}

#[tokio::test]
async fn test_duplicate_page_keeps_best_scoring_passage() {
    let h = harness(
        r#"{"country": "United States", "year": 2025, "search_query": "pacing challenge"}"#,
        vec![
            chunk("United States", 2025, "us_2025_NSS", 10, 0.74, "weaker copy"),
            chunk("United States", 2025, "us_2025_NSS", 10, 0.81, "stronger copy"),
        ],
    );

    let result = h.pipeline.answer("US 2025 pacing challenge").await.unwrap();

    assert_eq!(result.chunks_retrieved, 1);
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].doc_name, "us_2025_NSS");
    assert_eq!(result.sources[0].page, 10);

    let prompt = &h.llm.answer_requests()[0].prompt;
    assert!(prompt.contains("stronger copy"));
    assert!(!prompt.contains("weaker copy"));
    assert!(!prompt.contains("[Source 2:"));
}

#[tokio::test]
async fn test_contradictory_range_never_reaches_the_store() {
    let h = harness(
        r#"{"country": "Japan", "year_min": 2020, "year_max": 2015, "search_query": "alliances"}"#,
        vec![chunk("Japan", 2022, "japan_2022", 4, 0.8, "Alliance with the United States.")],
    );

    let result = h.pipeline.answer("Japan alliances between 2020 and 2015").await.unwrap();

    assert_eq!(result.filters.year_min, None);
    assert_eq!(result.filters.year_max, None);
    for (filters, _) in h.store.searches() {
        assert!(filters.year_min.is_none() && filters.year_max.is_none());
    }
    assert_eq!(result.sources.len(), 1);
}

#[tokio::test]
async fn test_malformed_interpretation_degrades_to_unfiltered_search() {
    let h = harness("Sorry, I can't help with that.", us_candidates());
    let query = "Compare cyber priorities";

    let result = h.pipeline.answer(query).await.unwrap();

    assert!(result.interpretation_degraded);
    assert_eq!(result.parsed_query, ParsedIntent::fallback(query));
    assert!(result.filters.is_empty());
    assert_eq!(result.answer, ANSWER);
    assert_eq!(result.sources.len(), 4);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("interpretation_degraded").is_none());
}

#[tokio::test]
async fn test_repeated_question_is_deterministic() {
    let h = harness(LATEST_US_INTENT, us_candidates());
    let query = "latest US strategy on China";

    let first = h.pipeline.answer(query).await.unwrap();
    let second = h.pipeline.answer(query).await.unwrap();

    assert_eq!(first.filters, second.filters);
    assert_eq!(first.sources, second.sources);
    assert_eq!(first.parsed_query, second.parsed_query);
    assert_eq!(first.answer, second.answer);
}

#[tokio::test]
async fn test_blank_query_is_rejected_before_any_call() {
    let h = harness(LATEST_US_INTENT, us_candidates());

    let err = h.pipeline.answer("   \n").await.unwrap_err();

    assert!(matches!(err, AppError::InvalidQuery(_)));
    assert_eq!(err.kind(), "invalid_query");
    assert_eq!(h.llm.total_calls(), 0);
    assert_eq!(h.embedder.calls(), 0);
}

#[tokio::test]
async fn test_zero_top_k_skips_retrieval_and_answer() {
    let h = harness(LATEST_US_INTENT, us_candidates());

    let result = h.pipeline.answer_with_top_k("US on China", 0).await.unwrap();

    assert_eq!(result.answer, NO_RESULTS_ANSWER);
    assert_eq!(h.embedder.calls(), 0);
    assert!(h.store.searches().is_empty());
    assert!(h.llm.answer_requests().is_empty());
}

#[tokio::test]
async fn test_top_k_bounds_sources() {
    let h = harness(r#"{"search_query": "security"}"#, us_candidates());

    let result = h.pipeline.answer_with_top_k("security", 2).await.unwrap();

    assert_eq!(result.chunks_retrieved, 2);
    assert_eq!(result.sources.len(), 2);
    assert_eq!(h.store.searches()[0].1, 6);
}

#[tokio::test]
async fn test_interpreter_transport_failure_is_fatal() {
    let (_temp, config) = test_config();
    let store = Arc::new(ScriptedStore::new(US_YEARS, us_candidates()));
    let pipeline = QueryPipeline::new(
        &config,
        Arc::new(FailingLlm),
        Arc::new(FixedEmbedder::default()),
        store.clone(),
    )
    .unwrap();

    let err = pipeline.answer("US on China").await.unwrap_err();
    assert!(matches!(err, AppError::Llm(_)));
    assert_eq!(err.kind(), "llm_error");
    assert!(store.searches().is_empty());
}

#[tokio::test]
async fn test_embedding_failure_is_fatal() {
    let (_temp, config) = test_config();
    let llm = Arc::new(RoutingLlm::new(LATEST_US_INTENT));
    let pipeline = QueryPipeline::new(
        &config,
        llm.clone(),
        Arc::new(FailingEmbedder),
        Arc::new(ScriptedStore::new(US_YEARS, us_candidates())),
    )
    .unwrap();

    let err = pipeline.answer("US on China").await.unwrap_err();
    assert!(matches!(err, AppError::Embedding(_)));
    assert!(llm.answer_requests().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_fatal() {
    let (_temp, config) = test_config();
    let pipeline = QueryPipeline::new(
        &config,
        Arc::new(RoutingLlm::new(LATEST_US_INTENT)),
        Arc::new(FixedEmbedder::default()),
        Arc::new(FailingStore),
    )
    .unwrap();

    let err = pipeline.answer("US on China").await.unwrap_err();
    assert!(matches!(err, AppError::Store(_)));
    assert!(pipeline.stats().await.is_err());
}

#[tokio::test]
async fn test_country_only_scope_leaves_latest_unbounded_without_country() {
    let (_temp, mut config) = test_config();
    config.pipeline.latest_scope = LatestScope::CountryOnly;
    let store = Arc::new(ScriptedStore::new(US_YEARS, us_candidates()));
    let pipeline = QueryPipeline::new(
        &config,
        Arc::new(RoutingLlm::new(r#"{"wants_latest": true, "search_query": "cyber"}"#)),
        Arc::new(FixedEmbedder::default()),
        store,
    )
    .unwrap();

    let result = pipeline.answer("latest strategies on cyber").await.unwrap();
    assert!(result.filters.is_empty());
}

#[tokio::test]
async fn test_stats_passthrough_with_memory_store() {
    let (_temp, config) = test_config();
    let record = |country: &str, year: i32, page: i32| ChunkRecord {
        text: "text".to_string(),
        country: country.to_string(),
        year,
        doc_name: format!("{}_{}", country, year),
        page,
        embedding: vec![1.0, 0.0, 0.0, 0.0],
    };
    let store = Arc::new(MemoryStore::new(vec![
        record("United States", 2022, 1),
        record("United States", 2022, 2),
        record("Japan", 2013, 1),
    ]));
    let pipeline = QueryPipeline::new(
        &config,
        Arc::new(RoutingLlm::new(LATEST_US_INTENT)),
        Arc::new(FixedEmbedder::default()),
        store.clone(),
    )
    .unwrap();

    let stats = pipeline.stats().await.unwrap();
    assert_eq!(stats, store.stats().await.unwrap());
    assert_eq!(stats.total_chunks, 3);
    assert_eq!(stats.countries, 2);
    assert_eq!(stats.year_range, Some((2013, 2022)));
}

#[tokio::test]
async fn test_workspace_prompt_override_is_used() {
    let (temp, config) = test_config();
    let prompts = temp.path().join(".nss").join("prompts");
    std::fs::create_dir_all(&prompts).unwrap();
    std::fs::write(
        prompts.join("nss.synthesize.yml"),
        r#"id: nss.synthesize
title: Terse answers
apiVersion: "1.0"
createdBy: test
parameters:
  maxTokens: 200
system: "Answer in one sentence."
template: "Q: {{query}}\n{{context}}"
output:
  format: text
"#,
    )
    .unwrap();

    let llm = Arc::new(RoutingLlm::new(LATEST_US_INTENT));
    let pipeline = QueryPipeline::new(
        &config,
        llm.clone(),
        Arc::new(FixedEmbedder::default()),
        Arc::new(ScriptedStore::new(US_YEARS, us_candidates())),
    )
    .unwrap();

    pipeline.answer("latest US on China").await.unwrap();

    let request = &llm.answer_requests()[0];
    assert_eq!(request.system.as_deref(), Some("Answer in one sentence."));
    assert_eq!(request.max_tokens, Some(200));
    assert!(request.prompt.starts_with("Q: latest US on China\n[Source 1:"));
}
