//! Query interpretation: one LLM call turns a question into a [`ParsedIntent`].

use crate::types::ParsedIntent;
use nss_core::AppResult;
use nss_llm::{LlmClient, LlmRequest};
use nss_prompt::{build_prompt, BuiltPrompt, PromptDefinition};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Common spellings mapped to the names used in document metadata.
const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("us", "United States"),
    ("usa", "United States"),
    ("u.s.", "United States"),
    ("u.s.a.", "United States"),
    ("america", "United States"),
    ("united states of america", "United States"),
    ("uk", "United Kingdom"),
    ("u.k.", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("prc", "China"),
    ("people's republic of china", "China"),
    ("russian federation", "Russia"),
    ("korea", "South Korea"),
    ("republic of korea", "South Korea"),
    ("rok", "South Korea"),
];

/// Outcome of interpreting a question.
///
/// Both variants carry a usable intent; `Fallback` means the model output
/// was rejected and the question will be searched verbatim without filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Parsed(ParsedIntent),
    Fallback { intent: ParsedIntent, reason: String },
}

impl Interpretation {
    fn fallback(raw_query: &str, reason: impl Into<String>) -> Self {
        Self::Fallback {
            intent: ParsedIntent::fallback(raw_query),
            reason: reason.into(),
        }
    }

    pub fn intent(&self) -> &ParsedIntent {
        match self {
            Self::Parsed(intent) | Self::Fallback { intent, .. } => intent,
        }
    }

    pub fn into_intent(self) -> ParsedIntent {
        match self {
            Self::Parsed(intent) | Self::Fallback { intent, .. } => intent,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Extracts country, year and topic from a question via the `nss.interpret` prompt.
pub struct QueryInterpreter {
    llm: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    countries: Vec<String>,
}

impl QueryInterpreter {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        countries: Vec<String>,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            prompt,
            countries,
        }
    }

    /// Interpret `raw_query`.
    ///
    /// Only a failed model call is an error; unusable output degrades to
    /// [`Interpretation::Fallback`].
    #[instrument(skip(self, raw_query), fields(provider = %self.llm.provider_name(), model = %self.model))]
    pub async fn interpret(&self, raw_query: &str) -> AppResult<Interpretation> {
        let mut variables = HashMap::new();
        variables.insert("query".to_string(), raw_query.to_string());
        variables.insert("countries".to_string(), self.countries.join(", "));

        let built = build_prompt(&self.prompt, &variables)?;
        let response = self.llm.complete(&llm_request(built, &self.model)).await?;
        debug!(output = %response.content, "Interpreter model output");

        let interpretation = parse_intent(&response.content, raw_query, &self.countries);
        match &interpretation {
            Interpretation::Parsed(intent) => info!(?intent, "Parsed query intent"),
            Interpretation::Fallback { reason, .. } => {
                warn!("Query interpretation degraded to unfiltered search: {}", reason)
            }
        }

        Ok(interpretation)
    }
}

/// Turn a rendered prompt into a request, applying the prompt's parameters.
pub(crate) fn llm_request(built: BuiltPrompt, model: &str) -> LlmRequest {
    let parameters = built.metadata.parameters;
    let mut request = LlmRequest::new(built.user, model);

    if let Some(system) = built.system {
        request = request.with_system(system);
    }
    if let Some(max_tokens) = parameters.max_tokens {
        request = request.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = parameters.temperature {
        request = request.with_temperature(temperature);
    }

    request
}

/// Parse model output into an intent, falling back on anything unusable.
pub fn parse_intent(output: &str, raw_query: &str, countries: &[String]) -> Interpretation {
    let Some(object) = extract_json_object(output) else {
        return Interpretation::fallback(raw_query, "model output contains no JSON object");
    };

    let search_query = match object.get("search_query") {
        Some(Value::String(query)) if query.trim().is_empty() => raw_query.to_string(),
        Some(Value::String(query)) => query.trim().to_string(),
        Some(_) => {
            return Interpretation::fallback(raw_query, "search_query is not a string");
        }
        None => return Interpretation::fallback(raw_query, "search_query is missing"),
    };

    let country = object
        .get("country")
        .and_then(Value::as_str)
        .and_then(|name| canonical_country(name, countries));

    Interpretation::Parsed(ParsedIntent {
        country,
        year: year_field(&object, "year"),
        year_min: year_field(&object, "year_min"),
        year_max: year_field(&object, "year_max"),
        wants_latest: bool_field(&object, "wants_latest"),
        search_query,
    })
}

/// The first JSON object in `text`, skipping code fences and surrounding prose.
///
/// Parsing is attempted at every `{`, so braces in leading prose do not hide
/// a later object.
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(object))) => Some(object),
            _ => None,
        }
    })
}

fn year_field(object: &Map<String, Value>, key: &str) -> Option<i32> {
    let year = match object.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    if (1000..=9999).contains(&year) {
        Some(year as i32)
    } else {
        None
    }
}

fn bool_field(object: &Map<String, Value>, key: &str) -> bool {
    match object.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Canonical spelling of `name`; names not in the list pass through trimmed.
fn canonical_country(name: &str, countries: &[String]) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Some(known) = countries.iter().find(|c| c.eq_ignore_ascii_case(name)) {
        return Some(known.clone());
    }

    let lower = name.to_lowercase();
    if let Some((_, canonical)) = COUNTRY_ALIASES.iter().find(|(alias, _)| *alias == lower) {
        return Some(canonical.to_string());
    }

    Some(name.to_string())
}
