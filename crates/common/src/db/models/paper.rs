//! Paper entity
//!
//! Owned by the surrounding catalog; read-only from the relation cache's side.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Author names joined by ", "
    #[sea_orm(column_type = "Text", nullable)]
    pub authors: Option<String>,

    pub year: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub venue: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub abstract_text: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::paper_relation::Entity", on_delete = "Cascade")]
    PaperRelations,
}

impl Related<super::paper_relation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperRelations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
