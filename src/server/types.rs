//! Request/response types for the HTTP API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exporters::ExportFormat;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Server status (always "ok" when healthy)
    pub status: String,
    /// Server version from Cargo.toml
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// New page order for a session. Unknown ids are tolerated and dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<Uuid>,
}

/// Export format selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPayload {
    pub format: ExportFormat,
}

/// Returned by the recognize endpoint: the task is already running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeResponse {
    pub task_id: Uuid,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code for programmatic handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: Some(code.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_includes_version() {
        let resp = HealthResponse::healthy();
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn recognize_response_uses_camel_case() {
        let resp = RecognizeResponse {
            task_id: Uuid::new_v4(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["taskId"].is_string());
    }

    #[test]
    fn error_response_omits_missing_code() {
        let json = serde_json::to_string(&ErrorResponse::new("nope")).unwrap();
        assert!(!json.contains("code"));
        let json = serde_json::to_string(&ErrorResponse::with_code("nope", "NOPE")).unwrap();
        assert!(json.contains("\"code\":\"NOPE\""));
    }

    #[test]
    fn reorder_request_parses() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"order":["{}"]}}"#, id);
        let req: ReorderRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.order, vec![id]);
    }
}
