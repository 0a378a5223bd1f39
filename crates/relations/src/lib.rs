//! CiteGraph relation cache
//!
//! Keeps, per catalog paper, a bounded and prioritized cache of the papers it
//! references and the papers citing it:
//! - `source`: bibliographic API client (Semantic Scholar)
//! - `priority`: relation scoring
//! - `store` / `cache`: storage seam and the capacity-bounded cache on top
//! - `resolver`: cache-or-fetch orchestration
//! - `graph`: node/link graph for the presentation layer
//! - `service`: the inbound operations exposed to the gateway

pub mod cache;
pub mod catalog;
pub mod graph;
pub mod locks;
pub mod priority;
pub mod resolver;
pub mod service;
pub mod source;
pub mod store;
mod types;

#[cfg(test)]
mod testing;

pub use cache::{InsertOutcome, RelationCache};
pub use catalog::{InMemoryCatalog, PaperCatalog};
pub use graph::{CitationGraph, GraphAssembler, GraphLink, GraphNode};
pub use priority::PriorityScorer;
pub use resolver::{RelationResolver, ResolutionState, ResolveSummary};
pub use service::{PaperRelations, RefreshReport, RelationService};
pub use source::{BibliographicSource, ExternalId, FetchedRelations, SemanticScholarClient, SourceError};
pub use store::{InMemoryRelationStore, PgRelationStore, RelationStore};
pub use types::{normalize_doi, RawRelation, RelationRecord, RelationType};

/// Default maximum number of cached records per (paper, relation type)
pub const MAX_RELATIONS_PER_TYPE: usize = 15;
