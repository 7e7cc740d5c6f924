//! Types flowing through the search pipeline

use crate::db::models::{Availability, PropertyType};
use crate::errors::AppError;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::prelude::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Response language. Selects prompt variant and localized fields; never
/// inferred from the query text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ar" => Ok(Language::Ar),
            other => Err(AppError::Validation {
                message: format!("Unsupported language: {}", other),
                field: Some("language".to_string()),
            }),
        }
    }
}

/// Structured constraints pulled out of a free-text query.
///
/// `Default` is the unfiltered search used whenever extraction fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFilters {
    /// Cities or districts, matched as substrings after retrieval
    pub location: Vec<String>,

    /// Inclusive lower price bound (EGP)
    pub min_price: Option<f64>,

    /// Inclusive upper price bound (EGP)
    pub max_price: Option<f64>,

    /// Exact bedroom count
    pub bedrooms: Option<u32>,

    /// Requested dwelling kinds; carried through but not used to filter
    pub property_type: Vec<String>,
}

impl ExtractedFilters {
    /// True when no field constrains the search
    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }
}

/// Joined unit / project / developer snapshot eligible for display.
///
/// Project and developer fields are optional because the store left-joins
/// them. Deserializes from the camelCase seed catalogue.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default = "Uuid::new_v4")]
    pub unit_id: Uuid,
    pub bedrooms: i32,
    pub bathrooms: Decimal,
    pub size_sqm: Decimal,
    pub price_egp: Decimal,
    pub unit_type: PropertyType,
    pub availability: Availability,
    pub project_name: Option<String>,
    pub project_name_ar: Option<String>,
    pub city: Option<String>,
    pub city_ar: Option<String>,
    pub district: Option<String>,
    pub lat: Option<Decimal>,
    pub lng: Option<Decimal>,
    pub developer_name: Option<String>,
    pub project_description: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl Candidate {
    /// Project name in `language`, English when the Arabic name is missing
    pub fn localized_name(&self, language: Language) -> &str {
        localize(self.project_name.as_deref(), self.project_name_ar.as_deref(), language)
    }

    /// City in `language`, English when the Arabic city is missing
    pub fn localized_city(&self, language: Language) -> &str {
        localize(self.city.as_deref(), self.city_ar.as_deref(), language)
    }
}

/// Pick the Arabic value for `ar` when it has content, otherwise English,
/// otherwise the empty string.
pub fn localize<'a>(english: Option<&'a str>, arabic: Option<&'a str>, language: Language) -> &'a str {
    let english = english.unwrap_or_default();
    match language {
        Language::En => english,
        Language::Ar => arabic.filter(|s| !s.trim().is_empty()).unwrap_or(english),
    }
}

/// Compact listing shown next to the answer; position N is citation [N]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub price: f64,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub size: f64,
}

/// Map marker for one candidate.
///
/// When `has_location` is false the coordinates are a (0, 0) placeholder and
/// must not be plotted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPin {
    pub id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub has_location: bool,
    pub name: String,
    pub price: f64,
    pub bedrooms: i32,
    #[serde(rename = "type")]
    pub unit_type: PropertyType,
}

/// Terminal output of one search invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub answer: String,
    pub sources: Vec<SourceSummary>,
    pub map_pins: Vec<MapPin>,
    /// Citation markers in `answer` that point outside the context
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_citations: Vec<usize>,
}

/// Decimal column value as a finite f64
pub fn decimal_to_f64(value: &Decimal) -> Option<f64> {
    value.to_f64().filter(|v| v.is_finite())
}
