//! End-to-end exercises of both HTTP surfaces over an in-memory page.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cdp_bridge::testing::FakePageDriver;
use run_executor::RunExecutor;
use serde_json::{json, Value};
use tower::ServiceExt;
use webpilot::collaborators::{JsonlHistoryStore, ScriptedPlanner};
use webpilot::server::{automation_router, session_router, ServeState};
use webpilot::{Config, SessionManager};

fn quiet_fake() -> Arc<FakePageDriver> {
    let fake = Arc::new(FakePageDriver::new());
    fake.set_eval_handler(|script| {
        if script.contains("readyState") {
            Some(Ok(json!("complete")))
        } else if script.contains("INTERACTIVE_TAGS") {
            Some(Ok(json!({
                "url": "about:blank", "title": "", "entries": [],
            })))
        } else {
            Some(Ok(json!(true)))
        }
    });
    fake
}

fn state_with(dir: &tempfile::TempDir) -> ServeState {
    let driver = quiet_fake();
    let config = Arc::new(Config {
        runs_root: dir.path().to_path_buf(),
        ..Config::default()
    });
    let executor = Arc::new(RunExecutor::new(
        driver.clone(),
        config.runs_root.clone(),
        Vec::new(),
    ));
    let manager = Arc::new(SessionManager::new(
        driver,
        None,
        Arc::new(ScriptedPlanner),
        Arc::new(JsonlHistoryStore::new(dir.path().join("history.jsonl"))),
        config.clone(),
    ));
    ServeState::new(config, manager, executor)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn empty_command_is_a_400() {
    let dir = tempfile::tempdir().unwrap();
    let app = session_router().with_state(state_with(&dir));
    let response = app
        .oneshot(post_json("/browser-use/session", json!({"command": "  "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION");
}

#[tokio::test]
async fn session_lifecycle_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir);
    let app = session_router().with_state(state.clone());

    let response = app
        .clone()
        .oneshot(post_json(
            "/browser-use/session",
            json!({"command": r#"{"actions": [{"type": "scroll", "to": 120}]}"#}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let session_id = body["session_id"].as_str().unwrap().to_string();

    // Poll the snapshot until the session settles.
    let mut status = String::new();
    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(get(&format!("/browser-use/session/{session_id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let snapshot = body_json(response).await;
        status = snapshot["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" || status == "cancelled" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status, "completed");

    // Instructions are rejected once the session is terminal.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/session/{session_id}/instruction"),
            json!({"instruction": "さらに続けて"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "not_running");
}

#[tokio::test]
async fn unknown_session_is_a_404_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let app = session_router().with_state(state_with(&dir));

    let response = app
        .clone()
        .oneshot(get("/browser-use/session/nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_json("/browser-use/session/nope/cancel", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_json(
            "/session/nope/instruction",
            json!({"instruction": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn healthz_answers_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = automation_router().with_state(state_with(&dir));
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn execute_dsl_returns_the_run_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let app = automation_router().with_state(state_with(&dir));

    let response = app
        .oneshot(post_json(
            "/execute-dsl",
            json!({
                "run_id": "run-http",
                "plan": {"actions": [{"type": "scroll", "to": 80}]},
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["run_id"], "run-http");
    assert_eq!(body["success"], true);
    // Legacy clients read `complete`; it always mirrors `is_done`.
    assert_eq!(body["complete"], body["is_done"]);
    assert!(body["observation"]["url"].is_string());
}

#[tokio::test]
async fn legacy_payload_form_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let app = automation_router().with_state(state_with(&dir));

    let response = app
        .oneshot(post_json(
            "/execute-dsl",
            json!({"actions": [{"action": "press_key", "key": "Control+S"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["results"][0]["name"], "press_key");
}

#[tokio::test]
async fn run_events_are_served_back() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir);
    let app = automation_router().with_state(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/execute-dsl",
            json!({"run_id": "run-evt", "actions": [{"type": "scroll", "to": 10}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get("/runs/run-evt/events"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert_eq!(body.lines().count(), 1);

    let response = app.oneshot(get("/runs/run-missing/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn schema_lists_the_action_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let app = automation_router().with_state(state_with(&dir));
    let response = app.oneshot(get("/schema")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["click"]["version"], 1);
    assert_eq!(body["press_key"]["deprecated"], false);
    assert!(body["stop"].is_object());
}
