//! CiteGraph Common Library
//!
//! Shared code for the CiteGraph services including:
//! - Database models and repository patterns
//! - Error types and the API response envelope
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod response;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use response::ApiResponse;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
