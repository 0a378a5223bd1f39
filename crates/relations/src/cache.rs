//! Capacity-bounded relation cache
//!
//! Each `(paper, relation type)` key holds at most `capacity` records. Once a
//! key is full, the lowest priority record is evicted before the new one is
//! stored. Every read-check-evict-insert sequence runs under the key's lock.

use crate::locks::KeyedLocks;
use crate::store::RelationStore;
use crate::types::{normalize_doi, RelationRecord, RelationType};
use citegraph_common::errors::Result;
use citegraph_common::metrics;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Result of a cache insertion
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// Stored; `evicted` lists the records removed to make room
    Inserted { evicted: Vec<RelationRecord> },
    /// A record with the same DOI (or title, without DOI) already exists
    Duplicate,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// Relation cache over a `RelationStore`
pub struct RelationCache {
    store: Arc<dyn RelationStore>,
    locks: KeyedLocks<(Uuid, RelationType)>,
    capacity: usize,
}

impl RelationCache {
    /// `capacity` below one is raised to one
    pub fn new(store: Arc<dyn RelationStore>, capacity: usize) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Dedup check: by DOI when one is given, otherwise by title
    pub async fn exists(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
        doi: Option<&str>,
        title: &str,
    ) -> Result<bool> {
        match doi.and_then(normalize_doi) {
            Some(doi) => Ok(self
                .store
                .find_by_doi(source_paper_id, relation_type, &doi)
                .await?
                .is_some()),
            None => Ok(self
                .store
                .find_by_title(source_paper_id, relation_type, title.trim())
                .await?
                .is_some()),
        }
    }

    /// Insert without a dedup check, evicting the lowest priority record if full
    pub async fn insert(&self, record: RelationRecord) -> Result<InsertOutcome> {
        let _guard = self
            .locks
            .lock((record.source_paper_id, record.relation_type))
            .await;
        self.insert_locked(record).await
    }

    /// Dedup check, eviction and insertion as one critical section
    pub async fn insert_if_absent(&self, record: RelationRecord) -> Result<InsertOutcome> {
        let _guard = self
            .locks
            .lock((record.source_paper_id, record.relation_type))
            .await;

        let present = self
            .exists(
                record.source_paper_id,
                record.relation_type,
                record.target_doi.as_deref(),
                &record.target_title,
            )
            .await?;
        if present {
            debug!(
                source_paper_id = %record.source_paper_id,
                relation_type = %record.relation_type,
                title = %record.target_title,
                "Relation already cached, skipping"
            );
            return Ok(InsertOutcome::Duplicate);
        }

        self.insert_locked(record).await
    }

    async fn insert_locked(&self, record: RelationRecord) -> Result<InsertOutcome> {
        let paper = record.source_paper_id;
        let relation_type = record.relation_type;

        let mut count = self.store.count(paper, relation_type).await?;
        let mut evicted = Vec::new();

        while count >= self.capacity as u64 {
            let Some(lowest) = self.store.lowest_priority(paper, relation_type).await? else {
                break;
            };

            self.store.delete(lowest.id).await?;
            debug!(
                source_paper_id = %paper,
                relation_type = %relation_type,
                evicted_id = %lowest.id,
                evicted_score = lowest.priority_score,
                "Evicted lowest priority relation"
            );
            evicted.push(lowest);
            count -= 1;
        }

        self.store.insert(record).await?;
        metrics::record_insert(relation_type.as_str(), evicted.len());

        Ok(InsertOutcome::Inserted { evicted })
    }

    /// All records of the key, highest priority first
    pub async fn list_by_priority_desc(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<RelationRecord>> {
        self.store
            .list_by_priority_desc(source_paper_id, relation_type)
            .await
    }

    /// Remove every record of a paper, both directions
    pub async fn delete_all(&self, source_paper_id: Uuid) -> Result<u64> {
        // Fixed lock order keeps concurrent callers deadlock-free
        let _references = self.locks.lock((source_paper_id, RelationType::References)).await;
        let _citations = self.locks.lock((source_paper_id, RelationType::CitedBy)).await;
        self.store.delete_all(source_paper_id).await
    }
}
