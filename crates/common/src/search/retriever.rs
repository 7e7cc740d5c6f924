//! Candidate retrieval from the property store

use super::model::{Candidate, ExtractedFilters};
use super::MAX_CANDIDATES;
use crate::db::models::Availability;
use crate::db::{PropertyStore, UnitQuery};
use crate::errors::{AppError, Result};
use sea_orm::prelude::Decimal;
use std::sync::Arc;

impl UnitQuery {
    /// Store predicates for `filters`. Location and property type are not
    /// pushed down.
    pub fn from_filters(filters: &ExtractedFilters, limit: usize) -> Result<Self> {
        Ok(Self {
            bedrooms: filters.bedrooms,
            min_price: price_bound(filters.min_price, "minPrice")?,
            max_price: price_bound(filters.max_price, "maxPrice")?,
            limit: limit as u64,
        })
    }
}

fn price_bound(value: Option<f64>, field: &str) -> Result<Option<Decimal>> {
    value
        .map(|v| {
            Decimal::try_from(v).map_err(|e| AppError::Validation {
                message: format!("Price {} cannot be used as a bound: {}", v, e),
                field: Some(field.to_string()),
            })
        })
        .transpose()
}

/// Capped, ordered lookup of available units
pub struct CandidateRetriever {
    store: Arc<dyn PropertyStore>,
    limit: usize,
}

impl CandidateRetriever {
    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self {
            store,
            limit: MAX_CANDIDATES,
        }
    }

    /// At most ten available units matching the price and bedroom filters,
    /// featured first then cheapest first. Store failures propagate.
    pub async fn retrieve(&self, filters: &ExtractedFilters) -> Result<Vec<Candidate>> {
        let query = UnitQuery::from_filters(filters, self.limit)?;
        let mut candidates = self.store.find_candidates(&query).await?;

        // Stores are trusted for ordering, not for the hard guarantees
        candidates.retain(|c| c.availability == Availability::Available);
        candidates.truncate(self.limit);

        tracing::debug!(count = candidates.len(), ?query, "Candidates retrieved");
        Ok(candidates)
    }
}
