//! API endpoints.

pub mod admin;
pub mod messages;
pub mod queues;

pub use admin::{health_check, login_for_access_token, persist_now};
pub use messages::{pull_message, push_message};
pub use queues::{create_queue, delete_queue, get_queue, list_queues};

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::QueueError;

/// Errors surfaced by the API, mapped onto status codes.
#[derive(Debug)]
pub enum ApiError {
    Queue(QueueError),
    Unauthorized,
    InvalidCredentials,
    Forbidden,
    Internal(String),
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        ApiError::Queue(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Queue(QueueError::Empty(_)) => return StatusCode::NO_CONTENT.into_response(),
            ApiError::Queue(err @ QueueError::NotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()),
            ApiError::Queue(err @ QueueError::QueueFull { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, err.to_string())
            }
            ApiError::Queue(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Unauthorized => return unauthorized("Could not validate credentials"),
            ApiError::InvalidCredentials => return unauthorized("Invalid credentials"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Not enough privileges".to_string()),
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(json!({ "detail": detail })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (QueueError::NotFound("q".into()), StatusCode::NOT_FOUND),
            (QueueError::QueueFull { queue: "q".into(), capacity: 1 }, StatusCode::TOO_MANY_REQUESTS),
            (QueueError::Empty("q".into()), StatusCode::NO_CONTENT),
            (QueueError::InvalidKind("x".into()), StatusCode::BAD_REQUEST),
            (QueueError::AlreadyExists("q".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        assert_eq!(ApiError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
