//! OpenAI API data models for the gateway's own responses.
//!
//! Chat completion bodies are never modelled here: they pass through the
//! gateway as untyped JSON maps so unknown fields survive untouched.

use serde::Serialize;

/// Owner reported for every advertised model.
pub const MODEL_OWNER: &str = "organization-owner";

// =============================================================================
// Models Endpoint Types
// =============================================================================

/// Response from /v1/models endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelsResponse {
    /// Build the listing from configured model ids, preserving their order.
    pub fn from_ids(ids: &[String], created: i64) -> Self {
        Self {
            object: "list".to_string(),
            data: ids
                .iter()
                .map(|id| ModelInfo::new(id.clone(), created))
                .collect(),
        }
    }
}

/// Information about a single model (OpenAI format).
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl ModelInfo {
    pub fn new(id: String, created: i64) -> Self {
        Self {
            id,
            object: "model".to_string(),
            created,
            owned_by: MODEL_OWNER.to_string(),
        }
    }
}

// =============================================================================
// Informational Endpoint Types
// =============================================================================

/// Payload for `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub models: Vec<String>,
    pub documentation: String,
}

/// Payload for `GET /docs`.
#[derive(Debug, Clone, Serialize)]
pub struct DocsInfo {
    pub message: String,
    pub swagger_ui: String,
    pub redoc: String,
}

impl Default for DocsInfo {
    fn default() -> Self {
        Self {
            message: "Visit /docs for the API documentation".to_string(),
            swagger_ui: "/docs".to_string(),
            redoc: "/redoc".to_string(),
        }
    }
}

// =============================================================================
// Error Response Types
// =============================================================================

/// Error response matching OpenAI format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: String,
}

impl ErrorResponse {
    /// Create an error response with an explicit type and code.
    pub fn with_code(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: code.into(),
            },
        }
    }

    /// The envelope returned for every failure on the forwarding path.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(message, "server_error", "internal_server_error")
    }
}
