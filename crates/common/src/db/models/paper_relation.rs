//! Cached bibliographic relation of a catalog paper

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_relations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Catalog paper owning this relation
    pub source_paper_id: Uuid,

    /// "REFERENCES" or "CITED_BY"
    #[sea_orm(column_type = "Text")]
    pub relation_type: String,

    #[sea_orm(column_type = "Text")]
    pub target_title: String,

    /// Normalized (lowercase, prefix-free) DOI
    #[sea_orm(column_type = "Text", nullable)]
    pub target_doi: Option<String>,

    /// Identifier in the bibliographic service
    #[sea_orm(column_type = "Text", nullable)]
    pub target_external_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub target_authors: Option<String>,

    pub target_year: Option<i32>,

    pub citation_count: Option<i32>,

    pub influential_citation_count: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub target_venue: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub target_abstract: Option<String>,

    /// JSON array of intent tags
    #[sea_orm(column_type = "JsonBinary")]
    pub citation_intents: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub open_access_url: Option<String>,

    /// Catalog paper matching `target_doi`, when one exists
    pub target_paper_id: Option<Uuid>,

    #[sea_orm(column_type = "Double")]
    pub priority_score: f64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::SourcePaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    SourcePaper,
}

impl Related<super::paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SourcePaper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
