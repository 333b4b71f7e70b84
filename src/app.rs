// src/app.rs

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::jwt::JwtManager;
use crate::auth::services::AuthService;
use crate::handlers::auth::{login, session};
use crate::handlers::health::health;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub jwt_manager: JwtManager,
    pub trust_forwarded_for: bool,
}

/// Configure les routes d'authentification
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/{portal}/login", post(login))
        .route("/session", get(session))
        .with_state(state)
}

/// Construit l'application complète
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes(state))
        // Middleware global de tracing
        .layer(TraceLayer::new_for_http())
}
