//! Inbound relation operations
//!
//! Every operation is keyed by a catalog paper id and fails with
//! `PaperNotFound` when the catalog does not know it. Upstream trouble never
//! fails an operation.

use crate::cache::RelationCache;
use crate::catalog::PaperCatalog;
use crate::graph::{CitationGraph, GraphAssembler};
use crate::priority::PriorityScorer;
use crate::resolver::{RelationResolver, ResolutionState, ResolveSummary};
use crate::source::BibliographicSource;
use crate::store::RelationStore;
use crate::types::{RawRelation, RelationRecord, RelationType};
use citegraph_common::config::AppConfig;
use citegraph_common::db::models::Paper;
use citegraph_common::errors::{AppError, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Both directions of a paper's cached relations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRelations {
    pub references: Vec<RelationRecord>,
    pub citations: Vec<RelationRecord>,
}

/// Result of a forced refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub outcome: ResolutionState,
    #[serde(flatten)]
    pub summary: ResolveSummary,
}

pub struct RelationService {
    resolver: RelationResolver,
    catalog: Arc<dyn PaperCatalog>,
    assembler: GraphAssembler,
}

impl RelationService {
    pub fn new(resolver: RelationResolver, catalog: Arc<dyn PaperCatalog>, assembler: GraphAssembler) -> Self {
        Self {
            resolver,
            catalog,
            assembler,
        }
    }

    /// Wire the service from its collaborators and application config
    pub fn from_config(
        config: &AppConfig,
        source: Arc<dyn BibliographicSource>,
        store: Arc<dyn RelationStore>,
        catalog: Arc<dyn PaperCatalog>,
    ) -> Self {
        let cache = Arc::new(RelationCache::new(store, config.relations.capacity));
        let scorer = PriorityScorer::new(config.relations.base_year);
        let resolver = RelationResolver::new(source, cache, catalog.clone(), scorer);
        let assembler = GraphAssembler::from_config(config.graph.current_year);

        info!(
            capacity = config.relations.capacity,
            base_year = scorer.base_year(),
            graph_year = assembler.current_year(),
            "Relation service initialized"
        );

        Self::new(resolver, catalog, assembler)
    }

    async fn require_paper(&self, paper_id: Uuid) -> Result<Paper> {
        self.catalog
            .find_paper(paper_id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound {
                id: paper_id.to_string(),
            })
    }

    /// Fetch relations unless already cached
    pub async fn fetch(&self, paper_id: Uuid) -> Result<ResolutionState> {
        let paper = self.require_paper(paper_id).await?;
        self.resolver.ensure_relations(&paper).await
    }

    /// Clear and refetch
    pub async fn refresh(&self, paper_id: Uuid) -> Result<RefreshReport> {
        let paper = self.require_paper(paper_id).await?;
        let (outcome, summary) = self.resolver.refresh(&paper).await?;
        Ok(RefreshReport { outcome, summary })
    }

    /// Store caller-supplied relations
    pub async fn ingest(
        &self,
        paper_id: Uuid,
        references: Vec<RawRelation>,
        citations: Vec<RawRelation>,
    ) -> Result<ResolveSummary> {
        self.require_paper(paper_id).await?;
        self.resolver.ingest(paper_id, references, citations).await
    }

    pub async fn references(&self, paper_id: Uuid) -> Result<Vec<RelationRecord>> {
        self.require_paper(paper_id).await?;
        self.list(paper_id, RelationType::References).await
    }

    pub async fn citations(&self, paper_id: Uuid) -> Result<Vec<RelationRecord>> {
        self.require_paper(paper_id).await?;
        self.list(paper_id, RelationType::CitedBy).await
    }

    pub async fn all(&self, paper_id: Uuid) -> Result<PaperRelations> {
        self.require_paper(paper_id).await?;
        self.list_both(paper_id).await
    }

    /// Remove all cached relations; returns how many were deleted
    pub async fn delete(&self, paper_id: Uuid) -> Result<u64> {
        self.require_paper(paper_id).await?;
        let removed = self.resolver.cache().delete_all(paper_id).await?;
        info!(paper_id = %paper_id, removed, "Deleted cached relations");
        Ok(removed)
    }

    /// Graph around the paper, resolving relations on demand
    pub async fn graph(&self, paper_id: Uuid) -> Result<CitationGraph> {
        let paper = self.require_paper(paper_id).await?;
        self.resolver.ensure_relations(&paper).await?;

        let relations = self.list_both(paper_id).await?;
        Ok(self
            .assembler
            .build_graph(&paper, &relations.references, &relations.citations))
    }

    async fn list(&self, paper_id: Uuid, relation_type: RelationType) -> Result<Vec<RelationRecord>> {
        self.resolver
            .cache()
            .list_by_priority_desc(paper_id, relation_type)
            .await
    }

    async fn list_both(&self, paper_id: Uuid) -> Result<PaperRelations> {
        let (references, citations) = futures::try_join!(
            self.list(paper_id, RelationType::References),
            self.list(paper_id, RelationType::CitedBy),
        )?;
        Ok(PaperRelations {
            references,
            citations,
        })
    }
}
