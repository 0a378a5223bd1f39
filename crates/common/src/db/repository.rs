//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::errors::Result;
use crate::db::DbPool;
use crate::db::models::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};
use uuid::Uuid;

/// Resolver prefixes a catalog row may still carry in front of its DOI
const DOI_PREFIXES: &[&str] = &[
    "",
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
    "doi: ",
];

/// Papers whose stored DOI matches a normalized (lowercase, unprefixed) DOI
fn papers_by_doi(doi: &str) -> Select<PaperEntity> {
    let doi = doi.to_lowercase();
    let candidates: Vec<String> = DOI_PREFIXES
        .iter()
        .map(|prefix| format!("{}{}", prefix, doi))
        .collect();

    PaperEntity::find()
        .filter(Expr::expr(Func::lower(Expr::col((PaperEntity, PaperColumn::Doi)))).is_in(candidates))
}

/// Eviction order: lowest score, then oldest, then smallest id
fn lowest_priority_relation(source_paper_id: Uuid, relation_type: &str) -> Select<PaperRelationEntity> {
    PaperRelationEntity::find()
        .filter(PaperRelationColumn::SourcePaperId.eq(source_paper_id))
        .filter(PaperRelationColumn::RelationType.eq(relation_type))
        .order_by_asc(PaperRelationColumn::PriorityScore)
        .order_by_asc(PaperRelationColumn::CreatedAt)
        .order_by_asc(PaperRelationColumn::Id)
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Paper Operations (catalog, read-only)
    // ========================================================================

    /// Find paper by ID
    pub async fn find_paper_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find paper by normalized DOI, ignoring case and resolver prefixes on the stored value
    pub async fn find_paper_by_doi(&self, doi: &str) -> Result<Option<Paper>> {
        papers_by_doi(doi)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Relation Operations
    // ========================================================================

    /// Find a relation of a paper by target DOI
    pub async fn find_relation_by_doi(
        &self,
        source_paper_id: Uuid,
        relation_type: &str,
        doi: &str,
    ) -> Result<Option<PaperRelation>> {
        PaperRelationEntity::find()
            .filter(PaperRelationColumn::SourcePaperId.eq(source_paper_id))
            .filter(PaperRelationColumn::RelationType.eq(relation_type))
            .filter(PaperRelationColumn::TargetDoi.eq(doi))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a relation of a paper by target title
    pub async fn find_relation_by_title(
        &self,
        source_paper_id: Uuid,
        relation_type: &str,
        title: &str,
    ) -> Result<Option<PaperRelation>> {
        PaperRelationEntity::find()
            .filter(PaperRelationColumn::SourcePaperId.eq(source_paper_id))
            .filter(PaperRelationColumn::RelationType.eq(relation_type))
            .filter(PaperRelationColumn::TargetTitle.eq(title))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Count relations of a paper in one direction
    pub async fn count_relations(&self, source_paper_id: Uuid, relation_type: &str) -> Result<u64> {
        PaperRelationEntity::find()
            .filter(PaperRelationColumn::SourcePaperId.eq(source_paper_id))
            .filter(PaperRelationColumn::RelationType.eq(relation_type))
            .count(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Lowest priority relation; ties go to the oldest row, then the smallest id
    pub async fn find_lowest_priority_relation(
        &self,
        source_paper_id: Uuid,
        relation_type: &str,
    ) -> Result<Option<PaperRelation>> {
        lowest_priority_relation(source_paper_id, relation_type)
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Insert a relation row
    pub async fn create_relation(&self, relation: PaperRelation) -> Result<PaperRelation> {
        let row = PaperRelationActiveModel {
            id: Set(relation.id),
            source_paper_id: Set(relation.source_paper_id),
            relation_type: Set(relation.relation_type),
            target_title: Set(relation.target_title),
            target_doi: Set(relation.target_doi),
            target_external_id: Set(relation.target_external_id),
            target_authors: Set(relation.target_authors),
            target_year: Set(relation.target_year),
            citation_count: Set(relation.citation_count),
            influential_citation_count: Set(relation.influential_citation_count),
            target_venue: Set(relation.target_venue),
            target_abstract: Set(relation.target_abstract),
            citation_intents: Set(relation.citation_intents),
            open_access_url: Set(relation.open_access_url),
            target_paper_id: Set(relation.target_paper_id),
            priority_score: Set(relation.priority_score),
            created_at: Set(relation.created_at),
            updated_at: Set(relation.updated_at),
        };

        row.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a single relation
    pub async fn delete_relation(&self, id: Uuid) -> Result<bool> {
        let result = PaperRelationEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// List relations of a paper in one direction, highest priority first
    pub async fn list_relations(
        &self,
        source_paper_id: Uuid,
        relation_type: &str,
    ) -> Result<Vec<PaperRelation>> {
        PaperRelationEntity::find()
            .filter(PaperRelationColumn::SourcePaperId.eq(source_paper_id))
            .filter(PaperRelationColumn::RelationType.eq(relation_type))
            .order_by_desc(PaperRelationColumn::PriorityScore)
            .order_by_asc(PaperRelationColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Delete every relation of a paper (both directions)
    pub async fn delete_relations_for_paper(&self, source_paper_id: Uuid) -> Result<u64> {
        let result = PaperRelationEntity::delete_many()
            .filter(PaperRelationColumn::SourcePaperId.eq(source_paper_id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }
}
