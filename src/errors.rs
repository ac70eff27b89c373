//! HTTP error envelope.
//!
//! No exception crosses the HTTP boundary: every failure becomes structured
//! JSON with a stable `code` and a human-readable `message`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Clone, Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    pub fn unavailable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "EXECUTION_ERROR", message)
    }
}

impl From<cdp_bridge::BridgeError> for ApiError {
    fn from(err: cdp_bridge::BridgeError) -> Self {
        match &err {
            cdp_bridge::BridgeError::SharedBrowserUnavailable { .. } => Self::unavailable(
                // Lowercase on the wire for compatibility with existing
                // session clients.
                "shared_browser_unavailable",
                err.to_string(),
            ),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": {
                "code": self.code,
                "message": self.message,
            },
        });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_unavailable_maps_to_503_with_legacy_code() {
        let err = ApiError::from(cdp_bridge::BridgeError::unavailable(vec![
            "http://vnc:9222".into(),
        ]));
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code, "shared_browser_unavailable");
        assert!(err.message.contains("http://vnc:9222"));
    }
}
