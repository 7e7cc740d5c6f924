//! Filter Extractor - turns a free-text query into `ExtractedFilters`
//!
//! One low-temperature completion call asks for a small JSON object. Any
//! failure (transport error, malformed JSON, missing or mistyped field)
//! degrades to the unfiltered defaults; extraction never blocks a search.

use super::model::ExtractedFilters;
use crate::llm::{CompletionRequest, CompletionService};
use crate::metrics;
use regex_lite::Regex;
use sea_orm::prelude::Decimal;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use thiserror::Error;

/// Near-deterministic: the output is structured data
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// A five-field JSON object fits comfortably
pub const EXTRACTION_MAX_TOKENS: u32 = 200;

const EXTRACTION_INSTRUCTION: &str = r#"Extract search filters from a real estate query (English or Arabic). Return JSON only.

Extract:
- location: array of cities/districts (e.g., ["New Cairo", "6th October"])
- minPrice: number in EGP (null if not specified)
- maxPrice: number in EGP (null if not specified)
- bedrooms: number (null if not specified)
- propertyType: array (e.g., ["apartment", "villa"])

Return only valid JSON, no other text:
{"location":[],"minPrice":null,"maxPrice":null,"bedrooms":null,"propertyType":[]}"#;

const REQUIRED_FIELDS: [&str; 5] = ["location", "minPrice", "maxPrice", "bedrooms", "propertyType"];

/// Why a model reply could not be used as filters
#[derive(Debug, Error)]
pub enum FilterParseError {
    #[error("reply is not valid JSON: {0}")]
    Malformed(serde_json::Error),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("field has the wrong type: {0}")]
    WrongType(serde_json::Error),

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl FilterParseError {
    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            FilterParseError::Malformed(_) => "malformed_json",
            FilterParseError::NotAnObject => "not_an_object",
            FilterParseError::MissingField(_) => "missing_field",
            FilterParseError::WrongType(_) => "wrong_type",
            FilterParseError::InvalidValue { .. } => "invalid_value",
        }
    }
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```(?:json)?[ \t]*\r?\n?").expect("fence pattern is valid"))
}

/// Remove markdown code fences (with or without a `json` tag)
pub fn strip_code_fences(raw: &str) -> String {
    fence_pattern().replace_all(raw, "").trim().to_string()
}

/// Parse and validate a model reply into filters
pub fn parse_filters(raw: &str) -> Result<ExtractedFilters, FilterParseError> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&cleaned).map_err(FilterParseError::Malformed)?;

    let object = value.as_object().ok_or(FilterParseError::NotAnObject)?;
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(FilterParseError::MissingField(*missing));
    }

    let mut filters: ExtractedFilters =
        serde_json::from_value(value).map_err(FilterParseError::WrongType)?;

    for (field, price) in [("minPrice", filters.min_price), ("maxPrice", filters.max_price)] {
        if let Some(p) = price {
            if !p.is_finite() || p < 0.0 {
                return Err(FilterParseError::InvalidValue {
                    field,
                    reason: format!("{} is not a non-negative amount", p),
                });
            }
            // Must be usable as a store bound
            if let Err(e) = Decimal::try_from(p) {
                return Err(FilterParseError::InvalidValue {
                    field,
                    reason: format!("{} is out of range: {}", p, e),
                });
            }
        }
    }

    filters.location = normalize_terms(filters.location);
    filters.property_type = normalize_terms(filters.property_type);

    Ok(filters)
}

fn normalize_terms(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Build the single extraction request for `query`
pub fn extraction_request(query: &str) -> CompletionRequest {
    CompletionRequest {
        instruction: EXTRACTION_INSTRUCTION.to_string(),
        user_content: format!("Query: \"{}\"", query),
        temperature: EXTRACTION_TEMPERATURE,
        max_output_tokens: EXTRACTION_MAX_TOKENS,
    }
}

/// Completion-backed filter extraction
pub struct FilterExtractor {
    completion: Arc<dyn CompletionService>,
}

impl FilterExtractor {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Extract filters; infallible by contract
    pub async fn extract(&self, query: &str) -> ExtractedFilters {
        let start = Instant::now();
        let provider = self.completion.provider();
        let outcome = self.completion.complete(&extraction_request(query)).await;
        metrics::record_completion(start.elapsed().as_secs_f64(), "extraction", provider, outcome.is_ok());

        let text = match outcome {
            Ok(completion) => completion.text,
            Err(e) => {
                tracing::warn!(error = %e, provider, "Filter extraction call failed, searching unfiltered");
                metrics::record_filter_fallback("upstream_error");
                return ExtractedFilters::default();
            }
        };

        match parse_filters(&text) {
            Ok(filters) => {
                tracing::debug!(?filters, "Filters extracted");
                filters
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse filters, using defaults");
                metrics::record_filter_fallback(e.reason());
                ExtractedFilters::default()
            }
        }
    }
}
