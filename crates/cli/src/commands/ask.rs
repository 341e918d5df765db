//! Ask command handler.

use clap::Args;
use nss_core::{config::AppConfig, AppError, AppResult};
use nss_rag::{AnswerResult, FilterSet, QueryPipeline};

/// Ask a question about the NSS corpus
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Number of passages to ground the answer on
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output the full result as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let query = self.question.join(" ");
        let pipeline = QueryPipeline::from_config(config).await?;

        let result = match self.top_k {
            Some(0) => {
                return Err(AppError::InvalidQuery(
                    "--top-k must be at least 1".to_string(),
                ))
            }
            Some(top_k) => pipeline.answer_with_top_k(&query, top_k).await?,
            None => pipeline.answer(&query).await?,
        };

        if result.interpretation_degraded {
            tracing::warn!("Could not extract filters from the question; searched all documents");
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print!("{}", render_answer(&result));
        }

        Ok(())
    }
}

/// Human-readable answer followed by the applied filters and numbered sources.
fn render_answer(result: &AnswerResult) -> String {
    let mut out = format!("{}\n", result.answer.trim_end());

    if !result.filters.is_empty() {
        out.push_str(&format!("\nFilters: {}\n", describe_filters(&result.filters)));
    }

    if !result.sources.is_empty() {
        out.push_str("\nSources:\n");
        for (i, source) in result.sources.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} {} ({}, p.{})\n",
                i + 1,
                source.country,
                source.year,
                source.doc_name,
                source.page
            ));
        }
    }

    out
}

fn describe_filters(filters: &FilterSet) -> String {
    let mut parts = Vec::new();
    if let Some(ref country) = filters.country {
        parts.push(format!("country={}", country));
    }
    match (filters.year_min, filters.year_max) {
        (Some(min), Some(max)) if min == max => parts.push(format!("year={}", min)),
        (Some(min), Some(max)) => parts.push(format!("years={}-{}", min, max)),
        (Some(min), None) => parts.push(format!("years>={}", min)),
        (None, Some(max)) => parts.push(format!("years<={}", max)),
        (None, None) => {}
    }
    parts.join(", ")
}
