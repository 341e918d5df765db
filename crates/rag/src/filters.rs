//! Filter resolution: [`ParsedIntent`] to a non-contradictory [`FilterSet`].

use crate::store::VectorStore;
use crate::types::{FilterSet, ParsedIntent};
use nss_core::{AppResult, LatestScope};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves "latest" against the corpus and normalizes year bounds.
pub struct FilterResolver {
    store: Arc<dyn VectorStore>,
    latest_scope: LatestScope,
}

impl FilterResolver {
    pub fn new(store: Arc<dyn VectorStore>, latest_scope: LatestScope) -> Self {
        Self {
            store,
            latest_scope,
        }
    }

    /// Build the filters for one request.
    ///
    /// The year index is read from the store on every call.
    pub async fn resolve(&self, intent: &ParsedIntent) -> AppResult<FilterSet> {
        let country = intent.country.clone();

        let (year_min, year_max) = if intent.wants_latest {
            let latest = match (country.as_deref(), self.latest_scope) {
                (Some(country), _) => self.store.latest_year(Some(country)).await?,
                (None, LatestScope::Global) => self.store.latest_year(None).await?,
                (None, LatestScope::CountryOnly) => None,
            };
            debug!(?country, ?latest, "Resolved latest year");
            (latest, latest)
        } else if let Some(year) = intent.year {
            (Some(year), Some(year))
        } else {
            (intent.year_min, intent.year_max)
        };

        let (year_min, year_max) = match (year_min, year_max) {
            (Some(min), Some(max)) if min > max => {
                warn!(
                    "Dropping both year bounds: {} > {} for query '{}'",
                    min, max, intent.search_query
                );
                (None, None)
            }
            bounds => bounds,
        };

        Ok(FilterSet {
            country,
            year_min,
            year_max,
        })
    }
}
