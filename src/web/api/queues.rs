//! API endpoints for queue management.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::core::message::MessageKind;
use crate::core::queue::QueueInfo;
use crate::web::auth::AuthUser;
use crate::web::AppState;

/// Queue listing response.
#[derive(Serialize, Deserialize)]
pub struct QueueList {
    pub queues: Vec<QueueInfo>,
}

/// Legacy per-queue configuration block.
#[derive(Deserialize, Default)]
pub struct QueueConfigRequest {
    pub max_messages: Option<usize>,
}

/// Create queue request.
#[derive(Deserialize)]
pub struct CreateQueueRequest {
    pub name: String,
    /// Defaults to "transaction" when omitted.
    pub queue_type: Option<String>,
    pub capacity: Option<usize>,
    pub config: Option<QueueConfigRequest>,
}

/// List all queues.
pub async fn list_queues(State(state): State<AppState>, _user: AuthUser) -> Json<QueueList> {
    Json(QueueList {
        queues: state.manager.list_queues(),
    })
}

/// Create a queue (admin only).
pub async fn create_queue(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateQueueRequest>,
) -> Result<Json<QueueInfo>, ApiError> {
    user.require_admin()?;

    let kind = match payload.queue_type.as_deref() {
        Some(raw) => raw.parse::<MessageKind>()?,
        None => MessageKind::Transaction,
    };
    let capacity = payload
        .capacity
        .or_else(|| payload.config.and_then(|c| c.max_messages));

    let info = state.manager.create_queue(&payload.name, kind, capacity)?;
    Ok(Json(info))
}

/// Get information about a queue.
pub async fn get_queue(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<QueueInfo>, ApiError> {
    state
        .manager
        .get_queue_info(&name)
        .map(Json)
        .ok_or_else(|| ApiError::Queue(crate::error::QueueError::NotFound(name)))
}

/// Delete a queue and all of its messages (admin only).
pub async fn delete_queue(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require_admin()?;

    // Removing the snapshot files touches the disk.
    let manager = state.manager.clone();
    let target = name.clone();
    tokio::task::spawn_blocking(move || manager.delete_queue(&target))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(serde_json::json!({
        "message": format!("Queue '{}' deleted successfully", name)
    })))
}
