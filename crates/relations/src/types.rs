//! Relation domain types

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// Direction of a relation, seen from the owning paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// The owning paper cites the target
    References,
    /// The target cites the owning paper
    CitedBy,
}

impl RelationType {
    pub const ALL: [RelationType; 2] = [RelationType::References, RelationType::CitedBy];

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::References => "REFERENCES",
            RelationType::CitedBy => "CITED_BY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "REFERENCES" => Some(RelationType::References),
            "CITED_BY" => Some(RelationType::CitedBy),
            _ => None,
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Related paper as delivered by the bibliographic service (or a caller), before scoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelation {
    /// Bibliographic service identifier
    #[serde(default, alias = "paperId")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub citation_count: Option<i32>,
    #[serde(default)]
    pub influential_citation_count: Option<i32>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default, alias = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default, alias = "intent")]
    pub intents: Vec<String>,
    #[serde(default)]
    pub open_access_url: Option<String>,
}

impl RawRelation {
    /// Trim the title and normalize the DOI; `None` when the title is blank
    pub fn normalized(mut self) -> Option<Self> {
        let title = self.title.trim();
        if title.is_empty() {
            return None;
        }
        self.title = title.to_string();
        self.doi = self.doi.as_deref().and_then(normalize_doi);
        self.intents.retain(|intent| !intent.trim().is_empty());
        self.intents.sort();
        self.intents.dedup();
        Some(self)
    }
}

/// Cached relation of a catalog paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
    pub id: Uuid,
    pub source_paper_id: Uuid,
    pub relation_type: RelationType,
    pub target_title: String,
    pub target_doi: Option<String>,
    pub target_external_id: Option<String>,
    pub target_authors: Option<String>,
    pub target_year: Option<i32>,
    pub citation_count: Option<i32>,
    pub influential_citation_count: Option<i32>,
    pub target_venue: Option<String>,
    pub target_abstract: Option<String>,
    pub citation_intents: Vec<String>,
    pub open_access_url: Option<String>,
    pub target_paper_id: Option<Uuid>,
    pub priority_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RelationRecord {
    /// Build a new record from a normalized raw relation
    pub fn new(
        source_paper_id: Uuid,
        relation_type: RelationType,
        raw: RawRelation,
        priority_score: f64,
        target_paper_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        let authors = if raw.authors.is_empty() {
            None
        } else {
            Some(raw.authors.join(", "))
        };

        Self {
            id: Uuid::now_v7(),
            source_paper_id,
            relation_type,
            target_title: raw.title,
            target_doi: raw.doi,
            target_external_id: raw.external_id,
            target_authors: authors,
            target_year: raw.year,
            citation_count: raw.citation_count,
            influential_citation_count: raw.influential_citation_count,
            target_venue: raw.venue,
            target_abstract: raw.abstract_text,
            citation_intents: raw.intents,
            open_access_url: raw.open_access_url,
            target_paper_id,
            priority_score,
            created_at: now,
            updated_at: now,
        }
    }
}

fn doi_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^(?i)(?:https?://(?:dx\.)?doi\.org/|doi:\s*)")
            .expect("DOI prefix pattern is valid")
    })
}

/// Canonical DOI form used for storage and dedup; `None` for blank input
pub fn normalize_doi(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = doi_prefix().replace(trimmed, "");
    let doi = stripped.trim().to_ascii_lowercase();
    if doi.is_empty() {
        None
    } else {
        Some(doi)
    }
}
