//! Citation graph handler

use axum::{
    extract::{Path, State},
    Json,
};

use super::parse_paper_id;
use crate::AppState;
use citegraph_common::{errors::Result, ApiResponse};
use citegraph_relations::CitationGraph;

/// Graph around a paper; relations are fetched on demand when none are cached
pub async fn citation_graph(
    State(state): State<AppState>,
    Path(paper_id): Path<String>,
) -> Result<Json<ApiResponse<CitationGraph>>> {
    let paper_id = parse_paper_id(&paper_id)?;
    let graph = state.relations.graph(paper_id).await?;

    tracing::debug!(
        paper_id = %paper_id,
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "Citation graph served"
    );

    Ok(Json(ApiResponse::ok("Citation graph built", graph)))
}
