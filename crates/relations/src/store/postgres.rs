//! Postgres relation store on top of the SeaORM repository

use super::RelationStore;
use crate::types::{RelationRecord, RelationType};
use async_trait::async_trait;
use chrono::Utc;
use citegraph_common::db::models::PaperRelation;
use citegraph_common::db::Repository;
use citegraph_common::errors::{AppError, Result};
use uuid::Uuid;

/// Relation store persisted in the `paper_relations` table
#[derive(Clone)]
pub struct PgRelationStore {
    repo: Repository,
}

impl PgRelationStore {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

fn to_row(record: RelationRecord) -> PaperRelation {
    PaperRelation {
        id: record.id,
        source_paper_id: record.source_paper_id,
        relation_type: record.relation_type.as_str().to_string(),
        target_title: record.target_title,
        target_doi: record.target_doi,
        target_external_id: record.target_external_id,
        target_authors: record.target_authors,
        target_year: record.target_year,
        citation_count: record.citation_count,
        influential_citation_count: record.influential_citation_count,
        target_venue: record.target_venue,
        target_abstract: record.target_abstract,
        citation_intents: serde_json::Value::from(record.citation_intents),
        open_access_url: record.open_access_url,
        target_paper_id: record.target_paper_id,
        priority_score: record.priority_score,
        created_at: record.created_at.into(),
        updated_at: record.updated_at.into(),
    }
}

fn from_row(row: PaperRelation) -> Result<RelationRecord> {
    let relation_type = RelationType::parse(&row.relation_type).ok_or_else(|| AppError::Internal {
        message: format!("Unknown relation type '{}' on relation {}", row.relation_type, row.id),
    })?;

    let citation_intents = match row.citation_intents {
        serde_json::Value::Null => Vec::new(),
        value => serde_json::from_value(value)?,
    };

    Ok(RelationRecord {
        id: row.id,
        source_paper_id: row.source_paper_id,
        relation_type,
        target_title: row.target_title,
        target_doi: row.target_doi,
        target_external_id: row.target_external_id,
        target_authors: row.target_authors,
        target_year: row.target_year,
        citation_count: row.citation_count,
        influential_citation_count: row.influential_citation_count,
        target_venue: row.target_venue,
        target_abstract: row.target_abstract,
        citation_intents,
        open_access_url: row.open_access_url,
        target_paper_id: row.target_paper_id,
        priority_score: row.priority_score,
        created_at: row.created_at.with_timezone(&Utc),
        updated_at: row.updated_at.with_timezone(&Utc),
    })
}

fn from_optional_row(row: Option<PaperRelation>) -> Result<Option<RelationRecord>> {
    row.map(from_row).transpose()
}

#[async_trait]
impl RelationStore for PgRelationStore {
    async fn find_by_doi(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
        doi: &str,
    ) -> Result<Option<RelationRecord>> {
        let row = self
            .repo
            .find_relation_by_doi(source_paper_id, relation_type.as_str(), doi)
            .await?;
        from_optional_row(row)
    }

    async fn find_by_title(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
        title: &str,
    ) -> Result<Option<RelationRecord>> {
        let row = self
            .repo
            .find_relation_by_title(source_paper_id, relation_type.as_str(), title)
            .await?;
        from_optional_row(row)
    }

    async fn count(&self, source_paper_id: Uuid, relation_type: RelationType) -> Result<u64> {
        self.repo.count_relations(source_paper_id, relation_type.as_str()).await
    }

    async fn lowest_priority(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Option<RelationRecord>> {
        let row = self
            .repo
            .find_lowest_priority_relation(source_paper_id, relation_type.as_str())
            .await?;
        from_optional_row(row)
    }

    async fn insert(&self, record: RelationRecord) -> Result<RelationRecord> {
        let row = self.repo.create_relation(to_row(record)).await?;
        from_row(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.repo.delete_relation(id).await
    }

    async fn list_by_priority_desc(
        &self,
        source_paper_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<RelationRecord>> {
        self.repo
            .list_relations(source_paper_id, relation_type.as_str())
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    async fn delete_all(&self, source_paper_id: Uuid) -> Result<u64> {
        self.repo.delete_relations_for_paper(source_paper_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRelation;

    #[test]
    fn test_row_mapping_preserves_fields() {
        let raw = RawRelation {
            external_id: Some("s2-1".into()),
            title: "Graph Attention Networks".into(),
            doi: Some("10.48550/arxiv.1710.10903".into()),
            authors: vec!["P. Velickovic".into()],
            year: Some(2018),
            citation_count: Some(9000),
            intents: vec!["background".into(), "methodology".into()],
            ..Default::default()
        };
        let record = RelationRecord::new(Uuid::new_v4(), RelationType::CitedBy, raw, 0.7, None);

        let row = to_row(record.clone());
        assert_eq!(row.relation_type, "CITED_BY");
        assert_eq!(row.citation_intents, serde_json::json!(["background", "methodology"]));

        let back = from_row(row).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_unknown_relation_type_is_internal_error() {
        let raw = RawRelation {
            title: "x".into(),
            ..Default::default()
        };
        let mut row = to_row(RelationRecord::new(Uuid::new_v4(), RelationType::References, raw, 0.0, None));
        row.relation_type = "SIBLING".into();
        assert!(matches!(from_row(row), Err(AppError::Internal { .. })));
    }

    #[test]
    fn test_null_intents_map_to_empty() {
        let raw = RawRelation {
            title: "x".into(),
            ..Default::default()
        };
        let mut row = to_row(RelationRecord::new(Uuid::new_v4(), RelationType::References, raw, 0.0, None));
        row.citation_intents = serde_json::Value::Null;
        assert!(from_row(row).unwrap().citation_intents.is_empty());
    }
}
