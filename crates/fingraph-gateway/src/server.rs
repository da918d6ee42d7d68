//! Gateway server: JSON routes over the knowledge pipeline

use crate::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use fingraph_core::FingraphConfig;
use fingraph_kg::{CachedGraph, KnowledgePipeline};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct AppState {
    pub pipeline: KnowledgePipeline,
}

impl AppState {
    pub fn new(pipeline: KnowledgePipeline) -> Arc<Self> {
        Arc::new(Self { pipeline })
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate-knowledge-graph", post(generate_handler))
        .route("/api/query-knowledge-graph", post(query_handler))
        .route("/api/clear-conversation", post(clear_handler))
        .route("/api/conversation", get(conversation_handler))
        .route("/api/last-knowledge-graph", get(last_graph_handler))
        .route("/api/allowed-types", get(allowed_types_handler))
        .route("/api/allowed-entity-types", get(entity_types_handler))
        .route("/api/allowed-predicates", get(predicates_handler))
        .route("/api/allowed-metric-types", get(metric_types_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

pub async fn start_server(config: &FingraphConfig, pipeline: KnowledgePipeline) -> anyhow::Result<()> {
    let model_ready = pipeline.model_ready();
    let app = router(AppState::new(pipeline));

    let bind_addr: SocketAddr = format!("{}:{}", config.server.bind.to_addr(), config.server.port).parse()?;

    info!("fingraph v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: http://{}", bind_addr);
    info!("  Provider:     {:?}", config.model.provider);
    info!("  Extraction:   {}", config.model.extraction_model);
    info!("  Query:        {}", config.model.query_model);
    info!("  Cache:        {}", config.storage.cache_path.display());
    if !model_ready {
        tracing::warn!("No model client configured; generate and query will fail until an API key is set");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let has_graph = matches!(state.pipeline.last_graph().await, Ok(Some(_)));
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model_ready": state.pipeline.model_ready(),
        "has_graph": has_graph,
    }))
}

async fn generate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<CachedGraph>, ApiError> {
    let req = body(payload)?;
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("text is required".into()));
    }
    let record = state.pipeline.generate(&req.text).await?;
    Ok(Json(record))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body(payload)?;
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query is required".into()));
    }
    let answer = state.pipeline.query(query).await?;
    Ok(Json(serde_json::json!({
        "answer": answer,
        "query": query,
    })))
}

async fn clear_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.pipeline.clear_conversation().await;
    Json(serde_json::json!({ "message": "Conversation history cleared" }))
}

async fn conversation_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.conversation().await)
}

async fn last_graph_handler(State(state): State<Arc<AppState>>) -> Result<Json<CachedGraph>, ApiError> {
    state
        .pipeline
        .last_graph()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no knowledge graph has been generated yet".into()))
}

async fn allowed_types_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.allowed_types())
}

async fn entity_types_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.allowed_types().entity_types)
}

async fn predicates_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.allowed_types().predicate_types)
}

async fn metric_types_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.allowed_types().metric_types)
}
