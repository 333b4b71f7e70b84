// src/handlers/auth.rs

use axum::extract::{Path, State, rejection::JsonRejection};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::Json;
use login_governor_api::{LoginRequest, LoginResponse};

use crate::app::AppState;
use crate::auth::extractors::{AuthClaims, ClientIp};
use crate::auth::portal::Portal;
use crate::error::AppError;
use crate::response::AppResponse;

/// POST /auth/{portal}/login
/// Connexion via le portail customer, admin, member ou logistic
pub async fn login(
    State(state): State<AppState>,
    Path(portal): Path<Portal>,
    ClientIp(ip): ClientIp,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<AppResponse<LoginResponse>, AppError> {
    let Json(payload) = payload?;

    // bcrypt verification blocks.
    let response = tokio::task::spawn_blocking(move || {
        state.auth_service.login(portal, &payload, ip)
    })
    .await
    .map_err(|e| AppError::internal(format!("login task failed: {e}")))??;

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(AppResponse::ok(response).with_headers(headers))
}

/// GET /auth/session
/// Retourne l'identité portée par le token
pub async fn session(claims: AuthClaims) -> AppResponse<serde_json::Value> {
    AppResponse::ok(serde_json::json!({
        "user_id": claims.sub,
        "user_type": claims.user_type,
        "expires_at": claims.exp,
    }))
}
