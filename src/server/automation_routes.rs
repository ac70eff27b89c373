//! Automation service routes (port B).

use axum::extract::{Path, Query, State};
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use page_interactions::safe_page_content;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::errors::ApiError;

use super::state::ServeState;

pub fn automation_router() -> Router<ServeState> {
    Router::new()
        .route("/source", get(page_source))
        .route("/url", get(page_url))
        .route("/screenshot", get(page_screenshot))
        .route("/elements", get(catalog_elements))
        .route("/catalog", get(catalog))
        .route("/execute-dsl", post(execute_dsl))
        .route("/runs/:run_id/events", get(run_events))
        .route("/schema", get(action_schema))
        .route("/healthz", get(|| async { "ok" }))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn page_source(State(state): State<ServeState>) -> impl IntoResponse {
    safe_page_content(state.executor.driver()).await
}

async fn page_url(State(state): State<ServeState>) -> Result<Json<Value>, ApiError> {
    let url = state
        .executor
        .driver()
        .url()
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(json!({ "url": url })))
}

async fn page_screenshot(State(state): State<ServeState>) -> Result<String, ApiError> {
    let bytes = state
        .executor
        .driver()
        .screenshot_png()
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

async fn catalog_elements(State(state): State<ServeState>) -> Result<Json<Value>, ApiError> {
    let catalog = match state.executor.last_catalog() {
        Some(catalog) => catalog,
        None => state
            .executor
            .refresh_catalog_now()
            .await
            .map_err(|err| ApiError::internal(err.to_string()))?,
    };
    Ok(Json(json!(catalog.entries)))
}

#[derive(Deserialize, Default)]
struct CatalogQuery {
    #[serde(default)]
    refresh: bool,
}

async fn catalog(
    State(state): State<ServeState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Value>, ApiError> {
    let catalog = if query.refresh {
        state
            .executor
            .refresh_catalog_now()
            .await
            .map_err(|err| ApiError::internal(err.to_string()))?
    } else {
        match state.executor.last_catalog() {
            Some(catalog) => catalog,
            None => state
                .executor
                .refresh_catalog_now()
                .await
                .map_err(|err| ApiError::internal(err.to_string()))?,
        }
    };
    Ok(Json(catalog.to_payload()))
}

async fn execute_dsl(
    State(state): State<ServeState>,
    Json(payload): Json<Value>,
) -> Json<Value> {
    let summary = state
        .executor
        .run(&payload, &CancellationToken::new())
        .await;
    Json(summary.to_payload())
}

async fn run_events(
    State(state): State<ServeState>,
    Path(run_id): Path<String>,
) -> Result<String, ApiError> {
    // Run ids are server-minted; refuse anything path-like.
    if run_id.contains('/') || run_id.contains("..") {
        return Err(ApiError::bad_request("invalid run id"));
    }
    let path = state.config.runs_root.join(&run_id).join("events.jsonl");
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("no events for run {run_id}")))
}

async fn action_schema(State(state): State<ServeState>) -> Json<Value> {
    Json(state.executor.registry().schema())
}
