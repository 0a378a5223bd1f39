//! API handlers module

pub mod graph;
pub mod health;
pub mod relations;

use citegraph_common::errors::{AppError, Result};
use uuid::Uuid;

/// Parse a path segment as a paper id, answering 400 in the envelope format
pub(crate) fn parse_paper_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidFormat {
        message: format!("'{}' is not a valid paper id", raw),
    })
}
