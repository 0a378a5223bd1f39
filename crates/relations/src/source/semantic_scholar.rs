//! Semantic Scholar Graph API client
//!
//! - `GET /paper/search?query=..&fields=paperId,title&limit=1` resolves a paper
//! - `GET /paper/{id}?fields=..` returns its references and citations in one call
//!
//! No retries: a failed call surfaces as `SourceError` (fetch) or `None`
//! (resolve) and the caller treats it as "no data available now".

use super::{BibliographicSource, ExternalId, FetchedRelations, SourceError};
use crate::types::RawRelation;
use async_trait::async_trait;
use citegraph_common::config::BibliographicConfig;
use citegraph_common::errors::{AppError, Result};
use citegraph_common::metrics;
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

type OutboundLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Fields requested for every related paper
const RELATED_FIELDS: &[&str] = &[
    "paperId",
    "title",
    "authors",
    "year",
    "externalIds",
    "citationCount",
    "influentialCitationCount",
    "venue",
    "abstract",
    "openAccessPdf",
];

fn detail_fields() -> String {
    let mut fields = vec!["paperId".to_string(), "title".to_string()];
    for direction in ["references", "citations"] {
        fields.extend(RELATED_FIELDS.iter().map(|f| format!("{}.{}", direction, f)));
    }
    fields.join(",")
}

// ============================================================================
// Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "paperId", default)]
    paper_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    references: Option<Vec<Value>>,
    #[serde(default)]
    citations: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RelatedPaper {
    #[serde(rename = "paperId", default)]
    paper_id: Option<String>,

    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    doi: Option<String>,

    #[serde(rename = "externalIds", default)]
    external_ids: Option<ExternalIds>,

    #[serde(default)]
    authors: Option<Vec<AuthorData>>,

    #[serde(default)]
    year: Option<i32>,

    #[serde(rename = "citationCount", default)]
    citation_count: Option<i32>,

    #[serde(rename = "influentialCitationCount", default)]
    influential_citation_count: Option<i32>,

    #[serde(default)]
    venue: Option<String>,

    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,

    #[serde(rename = "openAccessPdf", default)]
    open_access_pdf: Option<OpenAccessPdf>,

    #[serde(default, alias = "intents")]
    intent: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorData {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

impl RelatedPaper {
    fn into_raw(self) -> Option<RawRelation> {
        let doi = self
            .doi
            .or_else(|| self.external_ids.and_then(|ids| ids.doi));
        let authors = self
            .authors
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.name)
            .filter(|name| !name.trim().is_empty())
            .collect();

        RawRelation {
            external_id: self.paper_id,
            title: self.title?,
            doi,
            authors,
            year: self.year,
            citation_count: self.citation_count,
            influential_citation_count: self.influential_citation_count,
            venue: self.venue.filter(|v| !v.trim().is_empty()),
            abstract_text: self.abstract_text,
            intents: self.intent.unwrap_or_default(),
            open_access_url: self.open_access_pdf.and_then(|pdf| pdf.url),
        }
        .normalized()
    }
}

/// First search hit's paper id
pub fn parse_search(body: Value) -> std::result::Result<Option<ExternalId>, SourceError> {
    let response: SearchResponse =
        serde_json::from_value(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    Ok(response
        .data
        .into_iter()
        .next()
        .and_then(|hit| hit.paper_id)
        .filter(|id| !id.trim().is_empty())
        .map(ExternalId))
}

/// References and citations of a detail payload; malformed entries are skipped
pub fn parse_detail(body: Value) -> std::result::Result<FetchedRelations, SourceError> {
    if !body.is_object() {
        return Err(SourceError::Malformed("detail payload is not an object".into()));
    }
    let response: DetailResponse =
        serde_json::from_value(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let mut skipped = 0;
    let mut convert = |entries: Option<Vec<Value>>, direction: &str| -> Vec<RawRelation> {
        entries
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let parsed = serde_json::from_value::<RelatedPaper>(entry)
                    .ok()
                    .and_then(RelatedPaper::into_raw);
                if parsed.is_none() {
                    skipped += 1;
                    debug!(direction, "Skipping malformed related paper entry");
                }
                parsed
            })
            .collect()
    };

    let references = convert(response.references, "references");
    let citations = convert(response.citations, "citations");

    Ok(FetchedRelations {
        references,
        citations,
        skipped,
    })
}

// ============================================================================
// Client
// ============================================================================

/// Semantic Scholar client
pub struct SemanticScholarClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    limiter: Arc<OutboundLimiter>,
}

impl SemanticScholarClient {
    /// Build a client from configuration
    pub fn from_config(config: &BibliographicConfig) -> Result<Self> {
        let rps = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            AppError::Configuration {
                message: "bibliographic.requests_per_second must be greater than 0".into(),
            }
        })?;
        let burst = NonZeroU32::new(config.burst).ok_or_else(|| AppError::Configuration {
            message: "bibliographic.burst must be greater than 0".into(),
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("citegraph/", env!("CARGO_PKG_VERSION")))
            .build()?;

        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            requests_per_second = config.requests_per_second,
            api_key = config.api_key.is_some(),
            "Bibliographic client initialized"
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps).allow_burst(burst))),
        })
    }

    async fn get_json(
        &self,
        operation: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<Value, SourceError> {
        self.limiter.until_ready().await;

        let start = Instant::now();
        let result = self.send(url, query).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(SourceError::Status { .. }) => "status",
            Err(SourceError::Transport(e)) if e.is_timeout() => "timeout",
            Err(_) => "error",
        };
        metrics::record_upstream(operation, outcome, start.elapsed().as_secs_f64());
        result
    }

    async fn send(&self, url: &str, query: &[(&str, &str)]) -> std::result::Result<Value, SourceError> {
        let mut request = self.client.get(url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }

    async fn search(&self, query: &str) -> std::result::Result<Option<ExternalId>, SourceError> {
        let url = format!("{}/paper/search", self.base_url);
        let body = self
            .get_json("resolve", &url, &[("query", query), ("fields", "paperId,title"), ("limit", "1")])
            .await?;
        parse_search(body)
    }
}

#[async_trait]
impl BibliographicSource for SemanticScholarClient {
    async fn resolve_id(&self, doi: Option<&str>, title: &str) -> Option<ExternalId> {
        if let Some(doi) = doi.map(str::trim).filter(|d| !d.is_empty()) {
            match self.search(doi).await {
                Ok(Some(id)) => {
                    debug!(doi, external_id = %id, "Resolved paper by DOI");
                    return Some(id);
                }
                Ok(None) => debug!(doi, "No DOI match, falling back to title"),
                Err(e) => warn!(doi, error = %e, "DOI lookup failed, falling back to title"),
            }
        }

        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        match self.search(title).await {
            Ok(Some(id)) => {
                debug!(title, external_id = %id, "Resolved paper by title");
                Some(id)
            }
            Ok(None) => {
                info!(title, "Paper not found in bibliographic service");
                None
            }
            Err(e) => {
                warn!(title, error = %e, "Title lookup failed");
                None
            }
        }
    }

    async fn fetch_relations(&self, id: &ExternalId) -> std::result::Result<FetchedRelations, SourceError> {
        let url = format!("{}/paper/{}", self.base_url, id);
        let fields = detail_fields();
        let body = self.get_json("fetch", &url, &[("fields", fields.as_str())]).await?;

        let fetched = parse_detail(body)?;
        metrics::record_skipped_entries(fetched.skipped);

        info!(
            external_id = %id,
            references = fetched.references.len(),
            citations = fetched.citations.len(),
            skipped = fetched.skipped,
            "Fetched relations"
        );

        Ok(fetched)
    }
}
