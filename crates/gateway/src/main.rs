//! CiteGraph API Gateway
//!
//! HTTP entry point for the relation cache:
//! - Relation fetch/refresh/ingest/list/delete per catalog paper
//! - Citation graph for the front end
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use citegraph_common::{
    config::AppConfig,
    db::{DbPool, Repository},
    metrics,
};
use citegraph_relations::{PgRelationStore, RelationService, SemanticScholarClient};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::Notify};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub relations: Arc<RelationService>,
    /// `None` when running on the in-memory store
    pub db: Option<DbPool>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    let config = Arc::new(config);

    init_tracing(&config);

    info!("Starting CiteGraph API Gateway v{}", citegraph_common::VERSION);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .set_buckets_for_metric(
                Matcher::Suffix("upstream_duration_seconds".to_string()),
                metrics::UPSTREAM_BUCKETS,
            )?
            .install()?;
        info!(port = config.observability.metrics_port, "Prometheus exporter listening");
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repo = Repository::new(db.clone());

    // Wire the relation service
    let source = SemanticScholarClient::from_config(&config.bibliographic)?;
    let relations = RelationService::from_config(
        &config,
        Arc::new(source),
        Arc::new(PgRelationStore::new(repo.clone())),
        Arc::new(repo),
    );

    // Create app state
    let state = AppState {
        config: config.clone(),
        relations: Arc::new(relations),
        db: Some(db),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = Arc::new(Notify::new());
    let notify = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            notify.notify_one();
        })
        .into_future()
        .instrument(info_span!("service", name = %config.observability.service_name));

    let drain_timeout = config.shutdown_timeout();
    tokio::select! {
        result = server => result?,
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            warn!(timeout_secs = drain_timeout.as_secs(), "In-flight requests did not drain, forcing shutdown");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// JSON or pretty logs; `RUST_LOG` overrides the configured level
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Relation cache
        .route(
            "/papers/{paper_id}/relations",
            get(handlers::relations::list_relations)
                .post(handlers::relations::ingest_relations)
                .delete(handlers::relations::delete_relations),
        )
        .route("/papers/{paper_id}/relations/fetch", post(handlers::relations::fetch_relations))
        .route("/papers/{paper_id}/relations/refresh", post(handlers::relations::refresh_relations))
        .route("/papers/{paper_id}/relations/references", get(handlers::relations::list_references))
        .route("/papers/{paper_id}/relations/citations", get(handlers::relations::list_citations))

        // Presentation graph
        .route("/papers/{paper_id}/citation-graph", get(handlers::graph::citation_graph))
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_requests));

    let timeout = TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.config.request_timeout());

    // Compose the app
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use std::time::Duration;
    use citegraph_relations::{
        BibliographicSource, ExternalId, FetchedRelations, InMemoryCatalog, InMemoryRelationStore,
        RawRelation, SourceError,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Always resolves and returns the same relations, optionally after a delay
    struct StaticSource {
        references: usize,
        citations: usize,
        delay: Option<Duration>,
    }

    fn related(prefix: &str, n: usize) -> Vec<RawRelation> {
        (0..n)
            .map(|i| RawRelation {
                title: format!("{} {}", prefix, i),
                doi: Some(format!("10.4242/{}.{}", prefix, i)),
                citation_count: Some(i as i32 * 10),
                year: Some(2020),
                ..Default::default()
            })
            .collect()
    }

    #[async_trait]
    impl BibliographicSource for StaticSource {
        async fn resolve_id(&self, _doi: Option<&str>, _title: &str) -> Option<ExternalId> {
            Some(ExternalId("static".into()))
        }

        async fn fetch_relations(&self, _id: &ExternalId) -> Result<FetchedRelations, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(FetchedRelations {
                references: related("ref", self.references),
                citations: related("cit", self.citations),
                skipped: 0,
            })
        }
    }

    async fn app() -> (Router, Arc<InMemoryCatalog>) {
        app_with_delay(None).await
    }

    async fn app_with_delay(delay: Option<Duration>) -> (Router, Arc<InMemoryCatalog>) {
        let mut config = AppConfig::default();
        config.graph.current_year = Some(2024);
        config.server.request_timeout_secs = 5;

        let catalog = Arc::new(InMemoryCatalog::new());
        let relations = RelationService::from_config(
            &config,
            Arc::new(StaticSource {
                references: 3,
                citations: 2,
                delay,
            }),
            Arc::new(InMemoryRelationStore::new()),
            catalog.clone(),
        );

        let state = AppState {
            config: Arc::new(config),
            relations: Arc::new(relations),
            db: None,
        };
        (create_router(state), catalog)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (app, _) = app().await;

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = call(&app, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"]["database"]["status"], "in_memory");
    }

    #[tokio::test]
    async fn test_unknown_paper_is_404_envelope() {
        let (app, _) = app().await;
        let uri = format!("/v1/papers/{}/citation-graph", uuid::Uuid::new_v4());

        let (status, body) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "PAPER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_paper_id_is_400() {
        let (app, _) = app().await;
        let (status, body) = call(&app, "GET", "/v1/papers/not-a-uuid/relations", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_fetch_then_list_then_graph() {
        let (app, catalog) = app().await;
        let paper = catalog.add("Center", Some("10.1/center")).await;
        let base = format!("/v1/papers/{}/relations", paper.id);

        let (status, body) = call(&app, "POST", &format!("{}/fetch", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["state"], "populated");
        assert_eq!(body["data"]["referenceCount"], 3);

        let (_, body) = call(&app, "POST", &format!("{}/fetch", base), None).await;
        assert_eq!(body["data"]["state"], "cached");

        let (_, body) = call(&app, "GET", &format!("{}/references", base), None).await;
        let references = body["data"].as_array().unwrap();
        assert_eq!(references.len(), 3);
        assert_eq!(references[0]["relationType"], "REFERENCES");
        assert!(references[0]["priorityScore"].as_f64().unwrap() >= references[2]["priorityScore"].as_f64().unwrap());

        let (_, body) = call(&app, "GET", &format!("{}/citations", base), None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (_, body) = call(&app, "GET", &base, None).await;
        assert_eq!(body["data"]["references"].as_array().unwrap().len(), 3);

        let (status, body) = call(&app, "GET", &format!("/v1/papers/{}/citation-graph", paper.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["nodes"].as_array().unwrap().len(), 6);
        assert_eq!(body["data"]["links"].as_array().unwrap().len(), 5);
        assert_eq!(body["data"]["centralNode"]["title"], "Center");
    }

    #[tokio::test]
    async fn test_refresh_and_delete() {
        let (app, catalog) = app().await;
        let paper = catalog.add("Center", None).await;
        let base = format!("/v1/papers/{}/relations", paper.id);

        let (status, body) = call(&app, "POST", &format!("{}/refresh", base), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["referenceCount"], 3);
        assert_eq!(body["data"]["citationCount"], 2);

        let (status, body) = call(&app, "DELETE", &base, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["deleted"], 5);

        let (_, body) = call(&app, "GET", &format!("{}/references", base), None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_validates_and_stores() {
        let (app, catalog) = app().await;
        let paper = catalog.add("Center", None).await;
        let base = format!("/v1/papers/{}/relations", paper.id);

        let invalid = json!({"references": [{"title": ""}]});
        let (status, body) = call(&app, "POST", &base, Some(invalid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let valid = json!({
            "references": [
                {"paperId": "x1", "title": "Supplied", "doi": "10.9/S", "year": 2021, "citationCount": 40}
            ],
            "citations": [
                {"title": "Citing", "intent": ["background"]}
            ]
        });
        let (status, body) = call(&app, "POST", &base, Some(valid)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["inserted"], 2);

        let (_, body) = call(&app, "GET", &format!("{}/references", base), None).await;
        assert_eq!(body["data"][0]["targetDoi"], "10.9/s");
        assert_eq!(body["data"][0]["targetExternalId"], "x1");
    }

    #[tokio::test]
    async fn test_ingest_nested_list_is_validated() {
        let (app, catalog) = app().await;
        let paper = catalog.add("Center", None).await;
        let base = format!("/v1/papers/{}/relations", paper.id);

        let invalid = json!({"citations": [{"title": "Negative", "citationCount": -1}]});
        let (status, body) = call(&app, "POST", &base, Some(invalid)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (_, body) = call(&app, "GET", &format!("{}/citations", base), None).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out_with_408() {
        let (app, catalog) = app_with_delay(Some(Duration::from_secs(60))).await;
        let paper = catalog.add("Center", None).await;

        let uri = format!("/v1/papers/{}/relations/fetch", paper.id);
        let (status, _) = call(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    }
}
