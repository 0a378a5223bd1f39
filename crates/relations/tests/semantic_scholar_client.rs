//! Semantic Scholar client against a local stand-in server

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use citegraph_common::config::BibliographicConfig;
use citegraph_relations::{BibliographicSource, ExternalId, SemanticScholarClient, SourceError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

const API_KEY: &str = "test-key";

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let hit = match params.get("query").map(String::as_str) {
        Some("10.1000/known") => Some("doi-hit"),
        Some("Known Title") => Some("title-hit"),
        _ => None,
    };
    let data: Vec<Value> = hit
        .into_iter()
        .map(|id| json!({"paperId": id, "title": "whatever"}))
        .collect();
    Json(json!({"total": data.len(), "offset": 0, "data": data}))
}

async fn detail(
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return Err(StatusCode::FORBIDDEN);
    }
    let fields = params.get("fields").cloned().unwrap_or_default();
    if !fields.contains("references.citationCount") || !fields.contains("citations.externalIds") {
        return Err(StatusCode::BAD_REQUEST);
    }

    match id.as_str() {
        "doi-hit" => Ok(Json(json!({
            "paperId": "doi-hit",
            "title": "Center",
            "references": [
                {"paperId": "r1", "title": "Ref One", "year": 2017, "citationCount": 120,
                 "externalIds": {"DOI": "10.1/R1"}, "authors": [{"name": "Ada"}]},
                {"paperId": "r2", "title": null}
            ],
            "citations": [
                {"paperId": "c1", "title": "Cite One", "influentialCitationCount": 3}
            ]
        }))),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok(Json(json!({})))
        }
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/graph/v1/paper/search", get(search))
        .route("/graph/v1/paper/{id}", get(detail));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/graph/v1", addr)
}

async fn client() -> SemanticScholarClient {
    let config = BibliographicConfig {
        base_url: spawn_server().await,
        api_key: Some(API_KEY.to_string()),
        timeout_secs: 1,
        requests_per_second: 100,
        burst: 100,
    };
    SemanticScholarClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_resolves_by_doi_first() {
    let client = client().await;
    let id = client.resolve_id(Some("10.1000/known"), "Known Title").await;
    assert_eq!(id, Some(ExternalId("doi-hit".into())));
}

#[tokio::test]
async fn test_falls_back_to_title() {
    let client = client().await;
    let id = client.resolve_id(Some("10.1000/unknown"), "Known Title").await;
    assert_eq!(id, Some(ExternalId("title-hit".into())));

    let id = client.resolve_id(None, "Known Title").await;
    assert_eq!(id, Some(ExternalId("title-hit".into())));
}

#[tokio::test]
async fn test_unresolvable_paper_is_none() {
    let client = client().await;
    assert_eq!(client.resolve_id(Some("10.1000/unknown"), "Nobody Wrote This").await, None);
    assert_eq!(client.resolve_id(None, "   ").await, None);
}

#[tokio::test]
async fn test_fetches_and_parses_relations() {
    let client = client().await;
    let fetched = client
        .fetch_relations(&ExternalId("doi-hit".into()))
        .await
        .unwrap();

    assert_eq!(fetched.references.len(), 1);
    assert_eq!(fetched.citations.len(), 1);
    assert_eq!(fetched.skipped, 1);

    let reference = &fetched.references[0];
    assert_eq!(reference.title, "Ref One");
    assert_eq!(reference.doi.as_deref(), Some("10.1/r1"));
    assert_eq!(reference.authors, vec!["Ada".to_string()]);
    assert_eq!(fetched.citations[0].influential_citation_count, Some(3));
}

#[tokio::test]
async fn test_non_ok_status_is_a_call_failure() {
    let client = client().await;
    let err = client
        .fetch_relations(&ExternalId("missing".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Status { status: 404 }));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let client = client().await;
    let err = client
        .fetch_relations(&ExternalId("slow".into()))
        .await
        .unwrap_err();
    match err {
        SourceError::Transport(e) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {:?}", other),
    }
}
