//! Aqar Common Library
//!
//! Shared code for the Aqar property search service including:
//! - Natural-language search pipeline (filter extraction, retrieval,
//!   location refinement, answer synthesis, response assembly)
//! - Database models and the property store
//! - Completion service clients
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod search;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{InMemoryStore, PropertyStore, Repository};
pub use errors::{AppError, Result};
pub use llm::CompletionService;
pub use search::{Language, SearchPipeline, SearchResult};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
