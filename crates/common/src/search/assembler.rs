//! Response assembly: answer plus source cards and map pins

use super::model::{decimal_to_f64, Candidate, Language, MapPin, SearchResult, SourceSummary};
use super::MAX_SOURCES;
use sea_orm::prelude::Decimal;

/// Source card for one candidate
pub fn source_summary(c: &Candidate, language: Language) -> SourceSummary {
    SourceSummary {
        id: c.unit_id,
        name: c.localized_name(language).to_string(),
        location: c.localized_city(language).to_string(),
        price: decimal_to_f64(&c.price_egp).unwrap_or_default(),
        bedrooms: c.bedrooms,
        bathrooms: decimal_to_f64(&c.bathrooms).unwrap_or_default(),
        size: decimal_to_f64(&c.size_sqm).unwrap_or_default(),
    }
}

/// Map pin for one candidate; placeholder (0, 0) with `has_location = false`
/// when the project has no usable coordinates
pub fn map_pin(c: &Candidate, language: Language) -> MapPin {
    let (lat, lng, has_location) = match coordinates(c.lat.as_ref(), c.lng.as_ref()) {
        Some((lat, lng)) => (lat, lng, true),
        None => (0.0, 0.0, false),
    };

    MapPin {
        id: c.unit_id,
        lat,
        lng,
        has_location,
        name: c.localized_name(language).to_string(),
        price: decimal_to_f64(&c.price_egp).unwrap_or_default(),
        bedrooms: c.bedrooms,
        unit_type: c.unit_type,
    }
}

fn coordinates(lat: Option<&Decimal>, lng: Option<&Decimal>) -> Option<(f64, f64)> {
    let lat = decimal_to_f64(lat?)?;
    let lng = decimal_to_f64(lng?)?;
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng) {
        Some((lat, lng))
    } else {
        None
    }
}

/// Package the answer with the first three candidates as sources and every
/// candidate as a map pin, preserving order
pub fn assemble(answer: String, candidates: &[Candidate], language: Language) -> SearchResult {
    SearchResult {
        answer,
        sources: candidates
            .iter()
            .take(MAX_SOURCES)
            .map(|c| source_summary(c, language))
            .collect(),
        map_pins: candidates.iter().map(|c| map_pin(c, language)).collect(),
        invalid_citations: Vec::new(),
    }
}
