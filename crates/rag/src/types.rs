//! Data model shared by the pipeline stages.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Structured reading of a user question, produced once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub country: Option<String>,
    pub year: Option<i32>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub wants_latest: bool,

    /// Topic-only rewrite of the question; never empty
    pub search_query: String,
}

impl ParsedIntent {
    /// Filter-free intent that searches for the question verbatim.
    pub fn fallback(raw_query: &str) -> Self {
        Self {
            country: None,
            year: None,
            year_min: None,
            year_max: None,
            wants_latest: false,
            search_query: raw_query.to_string(),
        }
    }
}

/// Metadata predicates applied to retrieval.
///
/// Never contradictory: when both bounds are set, `year_min <= year_max`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        self.country.is_none() && self.year_min.is_none() && self.year_max.is_none()
    }

    /// Exact country match and inclusive year range.
    pub fn matches(&self, country: &str, year: i32) -> bool {
        if let Some(ref wanted) = self.country {
            if wanted != country {
                return false;
            }
        }
        if self.year_min.is_some_and(|min| year < min) {
            return false;
        }
        if self.year_max.is_some_and(|max| year > max) {
            return false;
        }
        true
    }

    pub fn matches_chunk(&self, chunk: &Chunk) -> bool {
        self.matches(&chunk.country, chunk.year)
    }
}

/// A retrieved passage with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub country: String,
    pub year: i32,
    pub doc_name: String,
    pub page: i32,
    pub similarity_score: f32,
}

impl Chunk {
    /// Deduplication key: one passage per document page.
    pub fn page_key(&self) -> (&str, i32) {
        (&self.doc_name, self.page)
    }
}

/// Where an answer's evidence came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceCitation {
    pub country: String,
    pub year: i32,
    pub doc_name: String,
    pub page: i32,
}

impl From<&Chunk> for SourceCitation {
    fn from(chunk: &Chunk) -> Self {
        Self {
            country: chunk.country.clone(),
            year: chunk.year,
            doc_name: chunk.doc_name.clone(),
            page: chunk.page,
        }
    }
}

/// Response payload for one question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResult {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub parsed_query: ParsedIntent,
    pub filters: FilterSet,

    /// Internal: the interpreter fell back to a filter-free intent
    #[serde(skip_serializing)]
    pub interpretation_degraded: bool,

    /// Internal: passages handed to the synthesizer
    #[serde(skip_serializing)]
    pub chunks_retrieved: usize,
}

/// Read-only corpus summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_chunks: usize,

    /// Number of distinct countries
    pub countries: usize,

    /// Distinct countries, sorted
    pub country_list: Vec<String>,

    /// Distinct years, ascending
    pub years: Vec<i32>,

    /// `[min, max]` over `years`, absent for an empty corpus
    pub year_range: Option<(i32, i32)>,

    /// Distinct years available for each country
    pub country_years: BTreeMap<String, Vec<i32>>,
}

impl CorpusStats {
    /// Build stats from a per-country year index.
    pub fn from_country_years(
        total_chunks: usize,
        country_years: BTreeMap<String, BTreeSet<i32>>,
    ) -> Self {
        let years: BTreeSet<i32> = country_years.values().flatten().copied().collect();
        let year_range = match (years.first(), years.last()) {
            (Some(&min), Some(&max)) => Some((min, max)),
            _ => None,
        };

        Self {
            total_chunks,
            countries: country_years.len(),
            country_list: country_years.keys().cloned().collect(),
            years: years.into_iter().collect(),
            year_range,
            country_years: country_years
                .into_iter()
                .map(|(country, years)| (country, years.into_iter().collect()))
                .collect(),
        }
    }
}
