//! Configuration management for Aqar services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Provider keys (ANTHROPIC_API_KEY, OPENAI_API_KEY)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Completion service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Search pipeline configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL, or `memory` for the in-process store
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// JSON catalogue loaded into the in-process store
    pub seed_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Completion provider: auto, anthropic, openai, mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Anthropic API key
    pub anthropic_api_key: Option<String>,

    /// Anthropic API base URL
    #[serde(default = "default_anthropic_base")]
    pub anthropic_base_url: String,

    /// Anthropic model
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI API base URL (for compatible endpoints)
    #[serde(default = "default_openai_base")]
    pub openai_base_url: String,

    /// OpenAI model
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per completion call (0 = single attempt)
    #[serde(default)]
    pub max_retries: u32,

    /// First backoff delay in milliseconds
    #[serde(default = "default_retry_initial")]
    pub retry_initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_retry_max")]
    pub retry_max_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Deadline for one whole search invocation, in seconds
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Check bracketed citations in answers against the context size
    #[serde(default = "default_enabled")]
    pub validate_citations: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "aqar_common=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (global)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_database_url() -> String { "postgres://localhost/aqar".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_llm_provider() -> String { "auto".to_string() }
fn default_anthropic_base() -> String { "https://api.anthropic.com/v1".to_string() }
fn default_anthropic_model() -> String { "claude-sonnet-4-20250514".to_string() }
fn default_openai_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_openai_model() -> String { "gpt-4-turbo".to_string() }
fn default_llm_timeout() -> u64 { 30 }
fn default_retry_initial() -> u64 { 200 }
fn default_retry_max() -> u64 { 5_000 }
fn default_search_timeout() -> u64 { 60 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "aqar".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // Conventional provider key variables win over everything else
            .set_override_option("llm.anthropic_api_key", non_empty_env("ANTHROPIC_API_KEY"))?
            .set_override_option("llm.openai_api_key", non_empty_env("OPENAI_API_KEY"))?

            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Whether the in-process store was requested instead of Postgres
    pub fn uses_memory_store(&self) -> bool {
        self.database.url.eq_ignore_ascii_case("memory")
    }
}

impl SearchConfig {
    /// Get the pipeline deadline as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LlmConfig {
    /// Get the per-request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            seed_path: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            anthropic_api_key: None,
            anthropic_base_url: default_anthropic_base(),
            anthropic_model: default_anthropic_model(),
            openai_api_key: None,
            openai_base_url: default_openai_base(),
            openai_model: default_openai_model(),
            timeout_secs: default_llm_timeout(),
            max_retries: 0,
            retry_initial_backoff_ms: default_retry_initial(),
            retry_max_backoff_ms: default_retry_max(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_search_timeout(),
            validate_citations: default_enabled(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.provider, "auto");
        assert_eq!(config.llm.anthropic_model, "claude-sonnet-4-20250514");
        assert_eq!(config.llm.openai_model, "gpt-4-turbo");
    }

    #[test]
    fn test_retries_disabled_by_default() {
        let config = AppConfig::default();
        assert_eq!(config.llm.max_retries, 0);
        assert!(config.search.validate_citations);
        assert_eq!(config.search.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_memory_store_switch() {
        let mut config = AppConfig::default();
        assert!(!config.uses_memory_store());
        config.database.url = "MEMORY".to_string();
        assert!(config.uses_memory_store());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                "[llm]\nprovider = \"mock\"\n[search]\ntimeout_secs = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.llm.provider, "mock");
        assert_eq!(config.search.timeout_secs, 5);
        assert!(config.search.validate_citations);
        assert_eq!(config.database.url, "postgres://localhost/aqar");
    }
}
