//! In-process property store
//!
//! Applies the same predicate, ordering and cap as the Postgres repository
//! over a fixed list of candidates. Used by tests and by `database.url =
//! "memory"` for local runs without Postgres.

use crate::db::models::Availability;
use crate::db::{PropertyStore, UnitQuery};
use crate::errors::{AppError, Result};
use crate::search::Candidate;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::path::Path;
use tracing::info;

/// Candidate list held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    candidates: Vec<Candidate>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store over the given rows; insertion order is the tie-break
    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Load a JSON array of candidates, e.g. `config/seed.json`
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
            message: format!("Cannot read seed catalogue {}: {}", path.display(), e),
        })?;
        let candidates: Vec<Candidate> = serde_json::from_str(&raw)?;

        info!(rows = candidates.len(), path = %path.display(), "Seed catalogue loaded");
        Ok(Self::with_candidates(candidates))
    }

    /// Number of rows held, regardless of availability
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn matches(candidate: &Candidate, query: &UnitQuery) -> bool {
        if candidate.availability != Availability::Available {
            return false;
        }
        if let Some(bedrooms) = query.bedrooms {
            if i64::from(candidate.bedrooms) != i64::from(bedrooms) {
                return false;
            }
        }
        if let Some(min_price) = query.min_price {
            if candidate.price_egp < min_price {
                return false;
            }
        }
        if let Some(max_price) = query.max_price {
            if candidate.price_egp > max_price {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl PropertyStore for InMemoryStore {
    async fn find_candidates(&self, query: &UnitQuery) -> Result<Vec<Candidate>> {
        let mut rows: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|c| Self::matches(c, query))
            .cloned()
            .collect();

        // sort_by is stable, ties keep insertion order
        rows.sort_by(|a, b| match b.featured.cmp(&a.featured) {
            Ordering::Equal => a.price_egp.cmp(&b.price_egp),
            other => other,
        });
        rows.truncate(usize::try_from(query.limit).unwrap_or(usize::MAX));

        Ok(rows)
    }
}
