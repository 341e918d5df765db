//! Stats command handler.
//!
//! Reads the vector store directly; no LLM or embedding credentials needed.

use clap::Args;
use nss_core::{config::AppConfig, AppResult};
use nss_rag::{CorpusStats, LanceDbStore, VectorStore};

/// Show corpus statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List the years available for each country
    #[arg(short, long)]
    pub detailed: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let store = LanceDbStore::open(
            &config.store_path(),
            &config.store.table,
            config.store.embedding_dim,
        )
        .await?;
        let stats = store.stats().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print!("{}", render_stats(&stats, self.detailed));
        }

        Ok(())
    }
}

fn render_stats(stats: &CorpusStats, detailed: bool) -> String {
    let mut out = format!("Chunks:    {}\n", stats.total_chunks);
    out.push_str(&format!("Countries: {}\n", stats.countries));
    match stats.year_range {
        Some((min, max)) => out.push_str(&format!("Years:     {}-{}\n", min, max)),
        None => out.push_str("Years:     none\n"),
    }

    if detailed {
        out.push('\n');
        for (country, years) in &stats.country_years {
            let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
            out.push_str(&format!("  {}: {}\n", country, years.join(", ")));
        }
    } else if !stats.country_list.is_empty() {
        out.push_str(&format!("\n{}\n", stats.country_list.join(", ")));
    }

    out
}
