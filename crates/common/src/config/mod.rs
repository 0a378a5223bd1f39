//! Configuration management for CiteGraph services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
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
    pub database: DatabaseConfig,

    /// Bibliographic API client configuration
    #[serde(default)]
    pub bibliographic: BibliographicConfig,

    /// Relation cache policy
    #[serde(default)]
    pub relations: RelationsConfig,

    /// Citation graph rendering
    #[serde(default)]
    pub graph: GraphConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
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
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BibliographicConfig {
    /// Base URL of the graph API
    #[serde(default = "default_bibliographic_base_url")]
    pub base_url: String,

    /// API key sent as `x-api-key` (optional, raises the upstream quota)
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_bibliographic_timeout")]
    pub timeout_secs: u64,

    /// Outbound requests per second
    #[serde(default = "default_bibliographic_rps")]
    pub requests_per_second: u32,

    /// Outbound burst capacity
    #[serde(default = "default_bibliographic_burst")]
    pub burst: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelationsConfig {
    /// Maximum cached records per (paper, relation type)
    #[serde(default = "default_relation_capacity")]
    pub capacity: usize,

    /// Reference year for the recency component of the priority score
    #[serde(default = "default_base_year")]
    pub base_year: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphConfig {
    /// Year used for node sizing; the current calendar year when unset
    pub current_year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name recorded on the server span
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_bibliographic_base_url() -> String { "https://api.semanticscholar.org/graph/v1".to_string() }
fn default_bibliographic_timeout() -> u64 { 10 }
fn default_bibliographic_rps() -> u32 { 1 }
fn default_bibliographic_burst() -> u32 { 1 }
fn default_relation_capacity() -> usize { 15 }
fn default_base_year() -> i32 { 2024 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "citegraph".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl BibliographicConfig {
    /// Per-request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BibliographicConfig {
    fn default() -> Self {
        Self {
            base_url: default_bibliographic_base_url(),
            api_key: None,
            timeout_secs: default_bibliographic_timeout(),
            requests_per_second: default_bibliographic_rps(),
            burst: default_bibliographic_burst(),
        }
    }
}

impl Default for RelationsConfig {
    fn default() -> Self {
        Self {
            capacity: default_relation_capacity(),
            base_year: default_base_year(),
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

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__BIBLIOGRAPHIC__API_KEY=...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relation cache cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relations.capacity == 0 {
            return Err(ConfigError::Message(
                "relations.capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/citegraph".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            bibliographic: BibliographicConfig::default(),
            relations: RelationsConfig::default(),
            graph: GraphConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
