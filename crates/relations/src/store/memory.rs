//! In-memory relation store

use super::RelationStore;
use crate::types::{RelationRecord, RelationType};
use async_trait::async_trait;
use citegraph_common::errors::Result;
use std::cmp::Ordering;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Relation store kept in process memory
#[derive(Default)]
pub struct InMemoryRelationStore {
    records: RwLock<Vec<RelationRecord>>,
}

impl InMemoryRelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all papers
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn matches_key(record: &RelationRecord, source_paper_id: Uuid, relation_type: RelationType) -> bool {
    record.source_paper_id == source_paper_id && record.relation_type == relation_type
}

/// Eviction order: score ascending, then oldest, then smallest id
fn eviction_order(a: &RelationRecord, b: &RelationRecord) -> Ordering {
    a.priority_score
        .total_cmp(&b.priority_score)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl RelationStore for InMemoryRelationStore {
    async fn find_by_doi(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
        doi: &str,
    ) -> Result<Option<RelationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| matches_key(r, source_paper_id, relation_type) && r.target_doi.as_deref() == Some(doi))
            .cloned())
    }

    async fn find_by_title(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
        title: &str,
    ) -> Result<Option<RelationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| matches_key(r, source_paper_id, relation_type) && r.target_title == title)
            .cloned())
    }

    async fn count(&self, source_paper_id: Uuid, relation_type: RelationType) -> Result<u64> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| matches_key(r, source_paper_id, relation_type))
            .count() as u64)
    }

    async fn lowest_priority(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Option<RelationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| matches_key(r, source_paper_id, relation_type))
            .min_by(|a, b| eviction_order(a, b))
            .cloned())
    }

    async fn insert(&self, record: RelationRecord) -> Result<RelationRecord> {
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    async fn list_by_priority_desc(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<RelationRecord>> {
        let records = self.records.read().await;
        let mut listed: Vec<RelationRecord> = records
            .iter()
            .filter(|r| matches_key(r, source_paper_id, relation_type))
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            b.priority_score
                .total_cmp(&a.priority_score)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(listed)
    }

    async fn delete_all(&self, source_paper_id: Uuid) -> Result<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.source_paper_id != source_paper_id);
        Ok((before - records.len()) as u64)
    }
}
