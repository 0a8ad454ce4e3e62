//! Health, token and operator endpoints.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ApiError;
use crate::web::auth::AuthUser;
use crate::web::AppState;

/// Token request parameters.
#[derive(Deserialize)]
pub struct TokenQuery {
    pub username: String,
    pub password: String,
}

/// Token response.
#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Snapshot response.
#[derive(Serialize, Deserialize)]
pub struct PersistResponse {
    pub queues_written: usize,
    pub messages_written: usize,
    pub failures: Vec<String>,
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Exchange credentials for an access token.
pub async fn login_for_access_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<TokenResponse>, ApiError> {
    let role = state
        .auth
        .authenticate(&query.username, &query.password)
        .ok_or_else(|| {
            tracing::warn!("Failed login for {}", query.username);
            ApiError::InvalidCredentials
        })?;

    let access_token = state
        .auth
        .generate_token(&query.username, role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// Take a snapshot right away (admin only).
pub async fn persist_now(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PersistResponse>, ApiError> {
    user.require_admin()?;

    let manager = state.manager.clone();
    let report = tokio::task::spawn_blocking(move || manager.persist_all())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(PersistResponse {
        queues_written: report.queues_written,
        messages_written: report.messages_written,
        failures: report.failures.iter().map(ToString::to_string).collect(),
    }))
}
