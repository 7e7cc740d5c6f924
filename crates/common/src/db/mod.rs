//! Database layer for Aqar
//!
//! Provides:
//! - SeaORM entity models
//! - The `PropertyStore` seam the search pipeline reads through
//! - A Postgres-backed repository and an in-process store
//! - Connection pool management

mod memory;
pub mod models;
mod repository;

pub use memory::InMemoryStore;
pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::search::Candidate;
use async_trait::async_trait;
use sea_orm::prelude::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Store-level predicate set for one candidate lookup.
///
/// `availability = available` is implied and cannot be switched off.
/// Location and property type are deliberately absent: location is refined
/// client-side after the capped query, type is not filtered at all.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitQuery {
    /// Exact bedroom count
    pub bedrooms: Option<u32>,

    /// Inclusive lower price bound (EGP)
    pub min_price: Option<Decimal>,

    /// Inclusive upper price bound (EGP)
    pub max_price: Option<Decimal>,

    /// Row cap
    pub limit: u64,
}

/// Read access to the unit/project/developer catalogue
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Available units matching `query`, ordered featured-first then by
    /// ascending price, at most `query.limit` rows.
    async fn find_candidates(&self, query: &UnitQuery) -> Result<Vec<Candidate>>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Database connection pool wrapper
pub struct DbPool {
    /// Primary connection
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e),
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e),
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);
    opts
}
