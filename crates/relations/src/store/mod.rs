//! Relation storage abstraction
//!
//! Provides the primitive operations the cache composes:
//! - In-memory store (tests, single-process deployments)
//! - Postgres store backed by the SeaORM repository

mod memory;
mod postgres;

pub use memory::InMemoryRelationStore;
pub use postgres::PgRelationStore;

use crate::types::{RelationRecord, RelationType};
use async_trait::async_trait;
use citegraph_common::errors::Result;
use uuid::Uuid;

/// Primitive relation storage
///
/// Implementations do not enforce capacity or uniqueness; `RelationCache`
/// does, under its per-key lock.
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Find a relation by normalized target DOI
    async fn find_by_doi(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
        doi: &str,
    ) -> Result<Option<RelationRecord>>;

    /// Find a relation by exact target title
    async fn find_by_title(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
        title: &str,
    ) -> Result<Option<RelationRecord>>;

    /// Number of relations for the key
    async fn count(&self, source_paper_id: Uuid, relation_type: RelationType) -> Result<u64>;

    /// Lowest priority record; ties resolved by oldest `created_at`, then smallest id
    async fn lowest_priority(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Option<RelationRecord>>;

    /// Persist a new record
    async fn insert(&self, record: RelationRecord) -> Result<RelationRecord>;

    /// Remove one record, returning whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// All records for the key, highest priority first
    async fn list_by_priority_desc(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<RelationRecord>>;

    /// Remove every record of a paper, both directions
    async fn delete_all(&self, source_paper_id: Uuid) -> Result<u64>;
}
