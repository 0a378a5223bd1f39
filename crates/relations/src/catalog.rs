//! Read-only access to the paper catalog

use async_trait::async_trait;
use chrono::Utc;
use citegraph_common::db::models::Paper;
use citegraph_common::db::Repository;
use citegraph_common::errors::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::types::normalize_doi;

/// Catalog lookups used by the relation cache
#[async_trait]
pub trait PaperCatalog: Send + Sync {
    async fn find_paper(&self, id: Uuid) -> Result<Option<Paper>>;

    /// Lookup by normalized DOI
    async fn find_paper_by_doi(&self, doi: &str) -> Result<Option<Paper>>;
}

#[async_trait]
impl PaperCatalog for Repository {
    async fn find_paper(&self, id: Uuid) -> Result<Option<Paper>> {
        self.find_paper_by_id(id).await
    }

    async fn find_paper_by_doi(&self, doi: &str) -> Result<Option<Paper>> {
        Repository::find_paper_by_doi(self, doi).await
    }
}

/// Catalog held in memory
#[derive(Default)]
pub struct InMemoryCatalog {
    papers: RwLock<HashMap<Uuid, Paper>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, paper: Paper) {
        self.papers.write().await.insert(paper.id, paper);
    }

    /// Create and register a paper with the given title and DOI
    pub async fn add(&self, title: &str, doi: Option<&str>) -> Paper {
        let now = Utc::now().fixed_offset();
        let paper = Paper {
            id: Uuid::now_v7(),
            doi: doi.map(str::to_string),
            title: title.to_string(),
            authors: None,
            year: None,
            venue: None,
            abstract_text: None,
            created_at: now,
            updated_at: now,
        };
        self.insert(paper.clone()).await;
        paper
    }
}

#[async_trait]
impl PaperCatalog for InMemoryCatalog {
    async fn find_paper(&self, id: Uuid) -> Result<Option<Paper>> {
        Ok(self.papers.read().await.get(&id).cloned())
    }

    async fn find_paper_by_doi(&self, doi: &str) -> Result<Option<Paper>> {
        let wanted = normalize_doi(doi);
        if wanted.is_none() {
            return Ok(None);
        }

        let papers = self.papers.read().await;
        Ok(papers
            .values()
            .find(|paper| paper.doi.as_deref().and_then(normalize_doi) == wanted)
            .cloned())
    }
}
