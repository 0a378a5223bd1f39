//! Bibliographic source abstraction
//!
//! Resolves catalog papers to an external identifier and fetches their
//! reference/citation lists.

mod semantic_scholar;

pub use semantic_scholar::{parse_detail, parse_search, SemanticScholarClient};

use crate::types::RawRelation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a paper in the bibliographic service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId(pub String);

impl ExternalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Related papers of one paper, both directions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedRelations {
    pub references: Vec<RawRelation>,
    pub citations: Vec<RawRelation>,
    /// Entries dropped as malformed
    pub skipped: usize,
}

impl FetchedRelations {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty() && self.citations.is_empty()
    }
}

/// Call-level failure of the bibliographic service
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status}")]
    Status { status: u16 },

    #[error("Malformed payload: {0}")]
    Malformed(String),
}

/// External bibliographic graph service
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    /// DOI lookup first, then title; `None` when both miss or the service fails
    async fn resolve_id(&self, doi: Option<&str>, title: &str) -> Option<ExternalId>;

    /// One detail call returning references and citations
    async fn fetch_relations(&self, id: &ExternalId) -> Result<FetchedRelations, SourceError>;
}
