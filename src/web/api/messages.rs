//! API endpoints for pushing and pulling messages.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::core::message::{Content, Message, MessageKind};
use crate::web::auth::AuthUser;
use crate::web::AppState;

/// Push request body.
#[derive(Deserialize)]
pub struct PushRequest {
    pub message_type: String,
    pub content: Content,
}

/// Push response.
#[derive(Serialize, Deserialize)]
pub struct PushResponse {
    pub message: String,
    pub message_id: String,
}

/// Pulled message.
#[derive(Serialize, Deserialize)]
pub struct PulledMessage {
    pub message_id: String,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl From<Message> for PulledMessage {
    fn from(message: Message) -> Self {
        Self {
            message_id: message.id,
            content: message.content,
            timestamp: message.timestamp,
            kind: message.kind,
        }
    }
}

/// Push a message to a queue (agent or admin).
pub async fn push_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
    Json(payload): Json<PushRequest>,
) -> Result<Json<PushResponse>, ApiError> {
    user.require_agent_or_admin()?;

    let message_id =
        state
            .manager
            .push(&name, payload.content, &payload.message_type, user.role)?;

    Ok(Json(PushResponse {
        message: format!("Message pushed to queue '{}'", name),
        message_id,
    }))
}

/// Pull the oldest message from a queue (agent or admin).
pub async fn pull_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<PulledMessage>, ApiError> {
    user.require_agent_or_admin()?;

    let message = state.manager.pull(&name, user.role)?;
    Ok(Json(PulledMessage::from(message)))
}
