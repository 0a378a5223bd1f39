//! Cache-or-fetch orchestration
//!
//! `ensure_relations` answers from the cache when the paper already has
//! relations, otherwise resolves the paper upstream, scores what comes back
//! and feeds it through the cache lowest score first, so a full key ends up
//! holding the highest scoring candidates. External failures
//! never become errors here; they show up as `NotFound` / `Unavailable`.

use crate::cache::RelationCache;
use crate::catalog::PaperCatalog;
use crate::locks::KeyedLocks;
use crate::priority::PriorityScorer;
use crate::source::BibliographicSource;
use crate::types::{RawRelation, RelationRecord, RelationType};
use citegraph_common::db::models::Paper;
use citegraph_common::errors::Result;
use citegraph_common::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Counts after a resolution pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSummary {
    /// Raw references received (fetched or supplied)
    pub fetched_references: usize,
    /// Raw citations received (fetched or supplied)
    pub fetched_citations: usize,
    /// Records stored by this pass, including any evicted later in the same pass
    pub inserted: usize,
    /// References cached after the pass
    pub reference_count: usize,
    /// Citations cached after the pass
    pub citation_count: usize,
}

/// Which branch a resolution took
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ResolutionState {
    /// Relations were already cached; nothing fetched
    Cached,
    /// Fetched upstream and stored
    Populated(ResolveSummary),
    /// The bibliographic service does not know the paper
    NotFound,
    /// The bibliographic service failed; try again later
    Unavailable,
}

pub struct RelationResolver {
    source: Arc<dyn BibliographicSource>,
    cache: Arc<RelationCache>,
    catalog: Arc<dyn PaperCatalog>,
    scorer: PriorityScorer,
    paper_locks: KeyedLocks<Uuid>,
}

impl RelationResolver {
    pub fn new(
        source: Arc<dyn BibliographicSource>,
        cache: Arc<RelationCache>,
        catalog: Arc<dyn PaperCatalog>,
        scorer: PriorityScorer,
    ) -> Self {
        Self {
            source,
            cache,
            catalog,
            scorer,
            paper_locks: KeyedLocks::new(),
        }
    }

    pub fn cache(&self) -> &Arc<RelationCache> {
        &self.cache
    }

    /// Make sure the paper has cached relations, fetching at most once
    #[instrument(skip(self, paper), fields(paper_id = %paper.id))]
    pub async fn ensure_relations(&self, paper: &Paper) -> Result<ResolutionState> {
        let _guard = self.paper_locks.lock(paper.id).await;

        if self.is_cached(paper.id).await? {
            metrics::record_cache(true);
            debug!("Relations already cached");
            return Ok(ResolutionState::Cached);
        }

        metrics::record_cache(false);
        self.populate(paper).await
    }

    /// Drop everything cached for the paper and fetch again
    #[instrument(skip(self, paper), fields(paper_id = %paper.id))]
    pub async fn refresh(&self, paper: &Paper) -> Result<(ResolutionState, ResolveSummary)> {
        let _guard = self.paper_locks.lock(paper.id).await;

        let removed = self.cache.delete_all(paper.id).await?;
        info!(removed, "Cleared cached relations for refresh");

        let state = self.populate(paper).await?;
        let summary = match &state {
            ResolutionState::Populated(summary) => summary.clone(),
            _ => self.counts(paper.id).await?,
        };

        Ok((state, summary))
    }

    /// Store caller-supplied relations through the regular scoring path
    #[instrument(skip(self, references, citations))]
    pub async fn ingest(
        &self,
        paper_id: Uuid,
        references: Vec<RawRelation>,
        citations: Vec<RawRelation>,
    ) -> Result<ResolveSummary> {
        let _guard = self.paper_locks.lock(paper_id).await;
        self.ingest_locked(paper_id, references, citations).await
    }

    async fn is_cached(&self, paper_id: Uuid) -> Result<bool> {
        for relation_type in RelationType::ALL {
            if !self.cache.list_by_priority_desc(paper_id, relation_type).await?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn populate(&self, paper: &Paper) -> Result<ResolutionState> {
        let Some(external_id) = self.source.resolve_id(paper.doi.as_deref(), &paper.title).await else {
            info!("Paper not found in bibliographic service");
            return Ok(ResolutionState::NotFound);
        };

        let fetched = match self.source.fetch_relations(&external_id).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(external_id = %external_id, error = %e, "Relation fetch failed");
                return Ok(ResolutionState::Unavailable);
            }
        };

        let summary = self
            .ingest_locked(paper.id, fetched.references, fetched.citations)
            .await?;
        Ok(ResolutionState::Populated(summary))
    }

    async fn ingest_locked(
        &self,
        paper_id: Uuid,
        references: Vec<RawRelation>,
        citations: Vec<RawRelation>,
    ) -> Result<ResolveSummary> {
        let mut summary = ResolveSummary {
            fetched_references: references.len(),
            fetched_citations: citations.len(),
            ..Default::default()
        };

        summary.inserted += self
            .ingest_direction(paper_id, RelationType::References, references)
            .await?;
        summary.inserted += self
            .ingest_direction(paper_id, RelationType::CitedBy, citations)
            .await?;

        let counts = self.counts(paper_id).await?;
        summary.reference_count = counts.reference_count;
        summary.citation_count = counts.citation_count;

        info!(
            paper_id = %paper_id,
            inserted = summary.inserted,
            references = summary.reference_count,
            citations = summary.citation_count,
            "Relations ingested"
        );

        Ok(summary)
    }

    async fn ingest_direction(
        &self,
        paper_id: Uuid,
        relation_type: RelationType,
        raws: Vec<RawRelation>,
    ) -> Result<usize> {
        let mut candidates: Vec<(f64, RawRelation)> = raws
            .into_iter()
            .filter_map(RawRelation::normalized)
            .map(|raw| {
                let score = self
                    .scorer
                    .score(raw.citation_count, raw.influential_citation_count, raw.year);
                (score, raw)
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut inserted = 0;
        for (score, raw) in candidates {
            if self
                .cache
                .exists(paper_id, relation_type, raw.doi.as_deref(), &raw.title)
                .await?
            {
                continue;
            }

            let target_paper_id = self.catalog_match(raw.doi.as_deref()).await;
            let record = RelationRecord::new(paper_id, relation_type, raw, score, target_paper_id);
            if self.cache.insert_if_absent(record).await?.is_inserted() {
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    /// Best-effort link to a catalog paper with the same DOI
    async fn catalog_match(&self, doi: Option<&str>) -> Option<Uuid> {
        let doi = doi?;
        match self.catalog.find_paper_by_doi(doi).await {
            Ok(paper) => paper.map(|p| p.id),
            Err(e) => {
                warn!(doi, error = %e, "Catalog lookup failed, leaving relation unlinked");
                None
            }
        }
    }

    async fn counts(&self, paper_id: Uuid) -> Result<ResolveSummary> {
        let references = self
            .cache
            .list_by_priority_desc(paper_id, RelationType::References)
            .await?;
        let citations = self
            .cache
            .list_by_priority_desc(paper_id, RelationType::CitedBy)
            .await?;

        Ok(ResolveSummary {
            reference_count: references.len(),
            citation_count: citations.len(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::source::FetchedRelations;
    use crate::store::InMemoryRelationStore;
    use crate::testing::{raw, raw_batch, ScriptedSource};
    use crate::MAX_RELATIONS_PER_TYPE;

    struct Fixture {
        source: Arc<ScriptedSource>,
        catalog: Arc<InMemoryCatalog>,
        resolver: RelationResolver,
    }

    fn fixture(source: ScriptedSource) -> Fixture {
        let source = Arc::new(source);
        let catalog = Arc::new(InMemoryCatalog::new());
        let cache = Arc::new(RelationCache::new(
            Arc::new(InMemoryRelationStore::new()),
            MAX_RELATIONS_PER_TYPE,
        ));
        let resolver = RelationResolver::new(
            source.clone(),
            cache,
            catalog.clone(),
            PriorityScorer::default(),
        );
        Fixture {
            source,
            catalog,
            resolver,
        }
    }

    async fn stored(resolver: &RelationResolver, paper: Uuid, relation_type: RelationType) -> Vec<RelationRecord> {
        resolver.cache().list_by_priority_desc(paper, relation_type).await.unwrap()
    }

    #[tokio::test]
    async fn test_ensure_fetches_once_then_serves_cache() {
        let f = fixture(ScriptedSource::returning(raw_batch("ref", 3), raw_batch("cit", 2)));
        let paper = f.catalog.add("Center", Some("10.1/center")).await;

        let first = f.resolver.ensure_relations(&paper).await.unwrap();
        let ResolutionState::Populated(summary) = first else {
            panic!("expected population, got {:?}", first);
        };
        assert_eq!(summary.reference_count, 3);
        assert_eq!(summary.citation_count, 2);
        assert_eq!(summary.inserted, 5);

        let second = f.resolver.ensure_relations(&paper).await.unwrap();
        assert_eq!(second, ResolutionState::Cached);
        assert_eq!(f.source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_one_populated_direction_counts_as_cached() {
        let f = fixture(ScriptedSource::returning(vec![], raw_batch("cit", 2)));
        let paper = f.catalog.add("Only cited", None).await;

        f.resolver.ensure_relations(&paper).await.unwrap();
        assert_eq!(f.resolver.ensure_relations(&paper).await.unwrap(), ResolutionState::Cached);
        assert_eq!(f.source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_unknown_paper_is_not_found() {
        let f = fixture(ScriptedSource::new(None, None));
        let paper = f.catalog.add("Obscure", None).await;

        let state = f.resolver.ensure_relations(&paper).await.unwrap();
        assert_eq!(state, ResolutionState::NotFound);
        assert_eq!(f.source.fetches(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_empty() {
        let f = fixture(ScriptedSource::new(Some("s2"), None));
        let paper = f.catalog.add("Flaky", None).await;

        let state = f.resolver.ensure_relations(&paper).await.unwrap();
        assert_eq!(state, ResolutionState::Unavailable);
        assert!(stored(&f.resolver, paper.id, RelationType::References).await.is_empty());

        // Still empty, so the next call tries again
        f.resolver.ensure_relations(&paper).await.unwrap();
        assert_eq!(f.source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_refresh_caps_at_top_scoring_relations() {
        let f = fixture(ScriptedSource::returning(raw_batch("old-ref", 10), raw_batch("old-cit", 5)));
        let paper = f.catalog.add("Center", None).await;
        f.resolver.ensure_relations(&paper).await.unwrap();
        assert_eq!(stored(&f.resolver, paper.id, RelationType::References).await.len(), 10);

        let fresh = raw_batch("new-ref", 20);
        f.source.set_relations(Some(FetchedRelations {
            references: fresh.clone(),
            citations: vec![],
            skipped: 0,
        }));

        let (state, summary) = f.resolver.refresh(&paper).await.unwrap();
        assert!(matches!(state, ResolutionState::Populated(_)));
        assert_eq!(summary.fetched_references, 20);
        assert_eq!(summary.reference_count, MAX_RELATIONS_PER_TYPE);
        assert_eq!(summary.citation_count, 0);

        let references = stored(&f.resolver, paper.id, RelationType::References).await;
        let mut titles: Vec<String> = references.iter().map(|r| r.target_title.clone()).collect();
        titles.sort();
        // raw_batch counts grow with the index, so the top 15 are 5..20
        let mut expected: Vec<String> = fresh[5..].iter().map(|r| r.title.clone()).collect();
        expected.sort();
        assert_eq!(titles, expected);
        assert!(references.iter().all(|r| !r.target_title.starts_with("old")));
    }

    #[tokio::test]
    async fn test_refresh_with_failed_fetch_leaves_paper_empty() {
        let f = fixture(ScriptedSource::returning(raw_batch("ref", 4), vec![]));
        let paper = f.catalog.add("Center", None).await;
        f.resolver.ensure_relations(&paper).await.unwrap();

        f.source.set_relations(None);
        let (state, summary) = f.resolver.refresh(&paper).await.unwrap();
        assert_eq!(state, ResolutionState::Unavailable);
        assert_eq!(summary.reference_count, 0);
    }

    #[tokio::test]
    async fn test_ingest_skips_duplicates_and_invalid_entries() {
        let f = fixture(ScriptedSource::new(None, None));
        let paper = Uuid::new_v4();

        let references = vec![
            raw("A", Some("10.1/a"), Some(10), Some(2020)),
            raw("A again", Some("https://doi.org/10.1/A"), Some(500), Some(2020)),
            raw("   ", None, Some(10), None),
            raw("B", None, None, None),
        ];
        let summary = f.resolver.ingest(paper, references, vec![]).await.unwrap();
        assert_eq!(summary.fetched_references, 4);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.reference_count, 2);
    }

    #[tokio::test]
    async fn test_scores_are_computed_not_supplied() {
        let f = fixture(ScriptedSource::new(None, None));
        let paper = Uuid::new_v4();

        let mut entry = raw("Scored", None, Some(500), Some(2024));
        entry.influential_citation_count = Some(50);
        f.resolver.ingest(paper, vec![entry], vec![]).await.unwrap();

        let records = stored(&f.resolver, paper, RelationType::References).await;
        assert!((records[0].priority_score - 0.65).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_ingest_into_full_key_evicts_lowest() {
        let f = fixture(ScriptedSource::returning(raw_batch("ref", MAX_RELATIONS_PER_TYPE), vec![]));
        let paper = f.catalog.add("Center", None).await;
        f.resolver.ensure_relations(&paper).await.unwrap();

        let summary = f
            .resolver
            .ingest(paper.id, vec![raw("Obscure preprint", None, Some(0), Some(1990))], vec![])
            .await
            .unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.reference_count, MAX_RELATIONS_PER_TYPE);

        let references = stored(&f.resolver, paper.id, RelationType::References).await;
        assert_eq!(references.last().map(|r| r.target_title.as_str()), Some("Obscure preprint"));
        // raw_batch index 0 has the fewest citations
        assert!(references.iter().all(|r| r.target_title != "ref 0"));
    }

    #[tokio::test]
    async fn test_target_paper_linked_by_doi() {
        let f = fixture(ScriptedSource::new(None, None));
        let known = f.catalog.add("Known", Some("10.7/KNOWN")).await;
        let paper = Uuid::new_v4();

        f.resolver
            .ingest(
                paper,
                vec![],
                vec![
                    raw("Known", Some("10.7/known"), None, None),
                    raw("Stranger", Some("10.7/other"), None, None),
                ],
            )
            .await
            .unwrap();

        let records = stored(&f.resolver, paper, RelationType::CitedBy).await;
        let linked: Vec<Option<Uuid>> = {
            let mut by_title: Vec<_> = records.iter().map(|r| (r.target_title.clone(), r.target_paper_id)).collect();
            by_title.sort();
            by_title.into_iter().map(|(_, id)| id).collect()
        };
        assert_eq!(linked, vec![Some(known.id), None]);
    }
}
