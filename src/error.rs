//! Error types for the queue service.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures returned by queue and registry operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueueError {
    #[error("Queue name '{0}' must be non-empty and alphanumeric (A-Z, a-z, 0-9)")]
    InvalidName(String),

    #[error("Queue with name '{0}' already exists")]
    AlreadyExists(String),

    #[error("Queue '{0}' does not exist")]
    NotFound(String),

    #[error("Unknown message type '{0}' (expected 'transaction' or 'prediction')")]
    InvalidKind(String),

    #[error("Queue '{queue}' accepts {expected} messages, got {actual}")]
    KindMismatch {
        queue: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid {kind} message: {reason}")]
    SchemaViolation { kind: String, reason: String },

    #[error("Queue '{queue}' is full (max {capacity} messages)")]
    QueueFull { queue: String, capacity: usize },

    #[error("Queue '{0}' is empty")]
    Empty(String),

    #[error("Queue capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("Persistence error for '{target}': {reason}")]
    PersistenceIo { target: String, reason: String },

    #[error("Corrupt snapshot for '{target}': {reason}")]
    LoadCorruption { target: String, reason: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Audit error: {0}")]
    Audit(String),
}
