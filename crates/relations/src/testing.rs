//! Test doubles shared by the unit tests

use crate::source::{BibliographicSource, ExternalId, FetchedRelations, SourceError};
use crate::types::RawRelation;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Bibliographic source answering from a script
///
/// `relations: None` makes every fetch fail with a 503.
pub struct ScriptedSource {
    id: Mutex<Option<ExternalId>>,
    relations: Mutex<Option<FetchedRelations>>,
    pub resolve_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(id: Option<&str>, relations: Option<FetchedRelations>) -> Self {
        Self {
            id: Mutex::new(id.map(|id| ExternalId(id.to_string()))),
            relations: Mutex::new(relations),
            resolve_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(references: Vec<RawRelation>, citations: Vec<RawRelation>) -> Self {
        Self::new(
            Some("s2-paper"),
            Some(FetchedRelations {
                references,
                citations,
                skipped: 0,
            }),
        )
    }

    pub fn set_relations(&self, relations: Option<FetchedRelations>) {
        *self.relations.lock().unwrap() = relations;
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BibliographicSource for ScriptedSource {
    async fn resolve_id(&self, _doi: Option<&str>, _title: &str) -> Option<ExternalId> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.id.lock().unwrap().clone()
    }

    async fn fetch_relations(&self, _id: &ExternalId) -> Result<FetchedRelations, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.relations
            .lock()
            .unwrap()
            .clone()
            .ok_or(SourceError::Status { status: 503 })
    }
}

/// Raw relation with the fields that drive scoring
pub fn raw(title: &str, doi: Option<&str>, citation_count: Option<i32>, year: Option<i32>) -> RawRelation {
    RawRelation {
        title: title.to_string(),
        doi: doi.map(str::to_string),
        citation_count,
        year,
        ..Default::default()
    }
}

/// `count` raw relations with distinct DOIs and increasing citation counts
pub fn raw_batch(prefix: &str, count: usize) -> Vec<RawRelation> {
    (0..count)
        .map(|i| {
            raw(
                &format!("{} {}", prefix, i),
                Some(&format!("10.5555/{}.{}", prefix, i)),
                Some((i as i32 + 1) * 40),
                Some(2015),
            )
        })
        .collect()
}
