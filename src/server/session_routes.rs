//! Session service routes (port A).

use axum::extract::{Path, State};
use axum::http::Method;
use axum::routing::post;
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::errors::ApiError;
use crate::session::InstructionOutcome;

use super::state::ServeState;

pub fn session_router() -> Router<ServeState> {
    Router::new()
        .route("/browser-use/session", post(start_session))
        .route("/browser-use/session/:id", get(get_session))
        .route("/browser-use/session/:id/cancel", post(cancel_session))
        .route("/session/:id/instruction", post(add_instruction))
        .route("/shared-browser/ensure", post(ensure_shared_browser))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[derive(Deserialize)]
struct StartSessionBody {
    command: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    max_steps: Option<u32>,
    #[serde(default)]
    conversation_context: Vec<String>,
}

async fn start_session(
    State(state): State<ServeState>,
    Json(body): Json<StartSessionBody>,
) -> Result<Json<Value>, ApiError> {
    if body.command.trim().is_empty() {
        return Err(ApiError::bad_request("command must not be empty"));
    }
    let session_id = state
        .manager
        .start_session(
            body.command,
            body.model,
            body.max_steps,
            body.conversation_context,
        )
        .await
        .map_err(ApiError::from)?;
    Ok(Json(json!({ "session_id": session_id.0 })))
}

async fn get_session(
    State(state): State<ServeState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.manager.get_status(&id) {
        Some(snapshot) => Ok(Json(serde_json::to_value(snapshot).unwrap_or(Value::Null))),
        None => Err(ApiError::not_found(format!("unknown session {id}"))),
    }
}

async fn cancel_session(
    State(state): State<ServeState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.manager.cancel_session(&id).await {
        Ok(Json(json!({ "status": "cancelled" })))
    } else {
        Err(ApiError::not_found(format!("unknown session {id}")))
    }
}

#[derive(Deserialize)]
struct InstructionBody {
    instruction: String,
}

async fn add_instruction(
    State(state): State<ServeState>,
    Path(id): Path<String>,
    Json(body): Json<InstructionBody>,
) -> Result<Json<Value>, ApiError> {
    match state.manager.add_instruction(&id, &body.instruction) {
        InstructionOutcome::Accepted => Ok(Json(json!({ "status": "accepted" }))),
        InstructionOutcome::NotFound => Err(ApiError::not_found(format!("unknown session {id}"))),
        InstructionOutcome::NotRunning => Err(ApiError::conflict(
            "not_running",
            "session is not running; instructions can only be appended while running",
        )),
        InstructionOutcome::Invalid => Err(ApiError::bad_request("instruction must not be empty")),
    }
}

#[derive(Deserialize, Default)]
struct EnsureBody {
    #[serde(default)]
    candidates: Vec<String>,
}

async fn ensure_shared_browser(
    State(state): State<ServeState>,
    body: Option<Json<EnsureBody>>,
) -> Result<Json<Value>, ApiError> {
    let body = body.map(|Json(inner)| inner).unwrap_or_default();
    let report = state
        .manager
        .ensure_shared_browser(&body.candidates)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(serde_json::to_value(report).unwrap_or(Value::Null)))
}
