// src/error.rs

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use login_governor_api::{ErrorResponse, LockoutInfo};

use crate::auth::portal::{IdentifierField, Portal};

/// Translation key the portals render under the identifier field.
const AUTH_FAILED: &str = "auth.failed";
const AUTH_WRONG_PORTAL: &str = "auth.wrong_portal";

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    // === Login outcomes ===
    #[error("Invalid credentials")]
    InvalidCredentials {
        field: IdentifierField,
        attempts_remaining: Option<u32>,
    },
    #[error("Too many login attempts, retry in {retry_after_seconds}s")]
    LockedOut {
        field: IdentifierField,
        locked_until: DateTime<Utc>,
        retry_after_seconds: i64,
    },
    #[error("This account cannot sign in through the {portal} portal")]
    WrongPortal {
        field: IdentifierField,
        portal: Portal,
        attempts_remaining: Option<u32>,
    },

    // === Validation ===
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid token format")]
    InvalidTokenFormat,
    #[error("Unauthorized: {0}")]
    UnauthorizedAction(String),

    // === Infrastructure ===
    #[error("Token generation failed: {0}")]
    TokenGenerationFailed(String),
    #[error("Attempt store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, internal_detail) = self.get_error_info();

        if let Some(ref detail) = internal_detail {
            tracing::error!(error_code, %status, detail, "Internal server error");
        }

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message: self.public_message(),
            details: self.details(),
        });

        let mut response = (status, body).into_response();
        if let AppError::LockedOut {
            retry_after_seconds,
            ..
        } = self
            && let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

impl AppError {
    /// Status, error code and (for 5xx) the detail that is logged but not returned.
    fn get_error_info(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 422 Unprocessable Entity: rendered as form errors by the portals
            AppError::InvalidCredentials { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_CREDENTIALS", None)
            }
            AppError::WrongPortal { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "WRONG_PORTAL", None),

            // 429 Too Many Requests
            AppError::LockedOut { .. } => (StatusCode::TOO_MANY_REQUESTS, "LOCKED_OUT", None),

            // 400 Bad Request
            AppError::InvalidEmail => (StatusCode::BAD_REQUEST, "INVALID_EMAIL", None),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", None),
            AppError::InvalidTokenFormat => (StatusCode::BAD_REQUEST, "INVALID_TOKEN_FORMAT", None),

            // 401 Unauthorized
            AppError::UnauthorizedAction(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", None),

            // 503 Service Unavailable
            AppError::StoreUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                Some(msg.clone()),
            ),

            // 500 Internal Server Error
            AppError::TokenGenerationFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TOKEN_ERROR",
                Some(msg.clone()),
            ),
            AppError::InternalServerError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                Some(msg.clone()),
            ),
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::StoreUnavailable(_) => {
                "Login is temporarily unavailable, please try again later".to_string()
            }
            AppError::TokenGenerationFailed(_) => {
                "An error occurred while generating token".to_string()
            }
            AppError::InternalServerError(_) => "An internal server error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// `{"<field>": "auth.failed", "lockout": {...}}` for login failures.
    fn details(&self) -> Option<serde_json::Value> {
        let (field, key, lockout) = match self {
            AppError::InvalidCredentials {
                field,
                attempts_remaining,
            } => (field, AUTH_FAILED, LockoutInfo::open(*attempts_remaining)),
            AppError::WrongPortal {
                field,
                attempts_remaining,
                ..
            } => (field, AUTH_WRONG_PORTAL, LockoutInfo::open(*attempts_remaining)),
            AppError::LockedOut {
                field,
                locked_until,
                retry_after_seconds,
            } => (
                field,
                AUTH_FAILED,
                LockoutInfo::locked(*locked_until, *retry_after_seconds),
            ),
            _ => return None,
        };

        let mut details = serde_json::Map::new();
        details.insert(field.as_str().to_string(), key.into());
        details.insert("lockout".to_string(), serde_json::to_value(lockout).ok()?);
        Some(serde_json::Value::Object(details))
    }

    // === Constructeurs helpers ===
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::InternalServerError(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::UnauthorizedAction(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        AppError::StoreUnavailable(msg.into())
    }
}

// === Conversions automatiques depuis d'autres types d'erreurs ===

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        AppError::store_unavailable(err.to_string())
    }
}

impl From<crate::auth::jwt::JwtError> for AppError {
    fn from(err: crate::auth::jwt::JwtError) -> Self {
        AppError::TokenGenerationFailed(err.to_string())
    }
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::invalid_input(format!("Invalid JSON: {err}"))
    }
}
