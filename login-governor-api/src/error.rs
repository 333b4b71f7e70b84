use serde::{Deserialize, Serialize};

/// Public API error response format
///
/// Login failures carry a `details` object keyed by the form field
/// (`email` or `member_id`) plus a `lockout` entry, e.g.
/// `{"email": "auth.failed", "lockout": {...}}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
