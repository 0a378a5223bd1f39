//! SeaORM entity models
//!
//! Database entities for CiteGraph

mod paper;
mod paper_relation;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use paper_relation::{
    Entity as PaperRelationEntity,
    Model as PaperRelation,
    ActiveModel as PaperRelationActiveModel,
    Column as PaperRelationColumn,
};
