//! Relation cache handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_paper_id;
use crate::AppState;
use citegraph_common::{
    errors::{AppError, Result},
    ApiResponse,
};
use citegraph_relations::{
    PaperRelations, RawRelation, RefreshReport, RelationRecord, ResolutionState, ResolveSummary,
};

/// Pre-fetched relations supplied by a caller
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestRelationsRequest {
    #[serde(default)]
    #[validate(length(max = 1000), nested)]
    pub references: Vec<RelationInput>,

    #[serde(default)]
    #[validate(length(max = 1000), nested)]
    pub citations: Vec<RelationInput>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RelationInput {
    #[serde(default, alias = "paperId")]
    pub external_id: Option<String>,

    #[validate(length(min = 1, max = 1000))]
    pub title: String,

    #[validate(length(max = 255))]
    pub doi: Option<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[validate(range(min = 0, max = 3000))]
    pub year: Option<i32>,

    #[validate(range(min = 0))]
    pub citation_count: Option<i32>,

    #[validate(range(min = 0))]
    pub influential_citation_count: Option<i32>,

    pub venue: Option<String>,

    #[serde(default, alias = "abstract")]
    pub abstract_text: Option<String>,

    #[serde(default, alias = "intent")]
    pub intents: Vec<String>,

    pub open_access_url: Option<String>,
}

impl From<RelationInput> for RawRelation {
    fn from(input: RelationInput) -> Self {
        RawRelation {
            external_id: input.external_id,
            title: input.title,
            doi: input.doi,
            authors: input.authors,
            year: input.year,
            citation_count: input.citation_count,
            influential_citation_count: input.influential_citation_count,
            venue: input.venue,
            abstract_text: input.abstract_text,
            intents: input.intents,
            open_access_url: input.open_access_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

fn resolution_message(state: &ResolutionState) -> &'static str {
    match state {
        ResolutionState::Cached => "Relations already cached",
        ResolutionState::Populated(_) => "Relations fetched",
        ResolutionState::NotFound => "Paper not found in bibliographic service, no relations available",
        ResolutionState::Unavailable => "Bibliographic service unavailable, no relations available",
    }
}

/// Fetch relations unless already cached
pub async fn fetch_relations(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<ApiResponse<ResolutionState>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let outcome = state.relations.fetch(paper_id).await?;
    Ok(Json(ApiResponse::ok(resolution_message(&outcome), outcome)))
}

/// Clear cached relations and fetch again
pub async fn refresh_relations(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<ApiResponse<RefreshReport>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let report = state.relations.refresh(paper_id).await?;

    let message = format!(
        "Relations refreshed: {} references, {} citations",
        report.summary.reference_count, report.summary.citation_count
    );
    Ok(Json(ApiResponse::ok(message, report)))
}

/// Store caller-supplied relations
pub async fn ingest_relations(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
    Json(request): Json<IngestRelationsRequest>,
) -> Result<Json<ApiResponse<ResolveSummary>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let references = request.references.into_iter().map(RawRelation::from).collect();
    let citations = request.citations.into_iter().map(RawRelation::from).collect();
    let summary = state.relations.ingest(paper_id, references, citations).await?;

    Ok(Json(ApiResponse::ok(
        format!("Saved {} relations", summary.inserted),
        summary,
    )))
}

/// Both directions
pub async fn list_relations(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<ApiResponse<PaperRelations>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let relations = state.relations.all(paper_id).await?;
    Ok(Json(ApiResponse::ok("Relations retrieved", relations)))
}

pub async fn list_references(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<RelationRecord>>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let references = state.relations.references(paper_id).await?;
    Ok(Json(ApiResponse::ok(
        format!("Found {} references", references.len()),
        references,
    )))
}

pub async fn list_citations(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<RelationRecord>>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let citations = state.relations.citations(paper_id).await?;
    Ok(Json(ApiResponse::ok(
        format!("Found {} citations", citations.len()),
        citations,
    )))
}

pub async fn delete_relations(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let deleted = state.relations.delete(paper_id).await?;

    tracing::info!(paper_id = %paper_id, deleted, "Relations deleted via API");

    Ok(Json(ApiResponse::ok(
        format!("Deleted {} relations", deleted),
        DeleteResponse { deleted },
    )))
}
