//! Messages, message kinds and content validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use crate::error::QueueError;

/// Message content: a JSON object.
pub type Content = Map<String, Value>;

/// Fields every transaction message must carry.
pub const TRANSACTION_FIELDS: [&str; 4] = ["transaction_id", "customer_id", "amount", "vendor_id"];

/// Fields every prediction message must carry.
pub const PREDICTION_FIELDS: [&str; 3] = ["transaction_id", "prediction", "confidence"];

/// Content category accepted by a queue.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Legacy snapshots without a recorded kind load as transaction queues.
    #[default]
    Transaction,
    Prediction,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Transaction => "transaction",
            MessageKind::Prediction => "prediction",
        }
    }

    /// Check that `content` carries the fields required for this kind.
    pub fn validate(&self, content: &Content) -> Result<(), QueueError> {
        let required: &[&str] = match self {
            MessageKind::Transaction => &TRANSACTION_FIELDS,
            MessageKind::Prediction => &PREDICTION_FIELDS,
        };

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|field| content.get(*field).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(self.violation(format!("missing field(s): {}", missing.join(", "))));
        }

        match self {
            MessageKind::Transaction => {
                if !content["amount"].is_number() {
                    return Err(self.violation("'amount' must be a number"));
                }
            }
            MessageKind::Prediction => {
                if !content["prediction"].is_boolean() {
                    return Err(self.violation("'prediction' must be a boolean"));
                }
                if !content["confidence"].is_number() {
                    return Err(self.violation("'confidence' must be a number"));
                }
            }
        }

        Ok(())
    }

    fn violation(&self, reason: impl Into<String>) -> QueueError {
        QueueError::SchemaViolation {
            kind: self.as_str().to_string(),
            reason: reason.into(),
        }
    }
}

impl FromStr for MessageKind {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transaction" => Ok(MessageKind::Transaction),
            "prediction" => Ok(MessageKind::Prediction),
            _ => Err(QueueError::InvalidKind(s.to_string())),
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization class of the caller, resolved by the auth layer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Agent,
    User,
}

impl ActorRole {
    /// May create and delete queues.
    pub fn can_administer(&self) -> bool {
        matches!(self, ActorRole::Admin)
    }

    /// May push and pull messages.
    pub fn can_write(&self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::Agent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Agent => "agent",
            ActorRole::User => "user",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued message. Never mutated after creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

impl Message {
    /// Create a message with a fresh id and the current time.
    pub fn new(content: Content, kind: MessageKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Name of the snapshot metadata file stem; no queue may shadow it.
pub const RESERVED_QUEUE_NAME: &str = "metadata";

/// Queue names are non-empty and strictly ASCII alphanumeric, so they are
/// safe as snapshot file stems and URL path segments.
pub fn is_valid_queue_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric())
        && !name.eq_ignore_ascii_case(RESERVED_QUEUE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> Content {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("transaction".parse::<MessageKind>().unwrap(), MessageKind::Transaction);
        assert_eq!("PREDICTION".parse::<MessageKind>().unwrap(), MessageKind::Prediction);
        assert_eq!(
            "refund".parse::<MessageKind>(),
            Err(QueueError::InvalidKind("refund".to_string()))
        );
    }

    #[test]
    fn test_transaction_validation() {
        let ok = content(json!({
            "transaction_id": "t1", "customer_id": "c1", "amount": 10, "vendor_id": "v1"
        }));
        assert!(MessageKind::Transaction.validate(&ok).is_ok());

        let missing = content(json!({"transaction_id": "t1", "amount": 10}));
        match MessageKind::Transaction.validate(&missing) {
            Err(QueueError::SchemaViolation { reason, .. }) => {
                assert!(reason.contains("customer_id"));
                assert!(reason.contains("vendor_id"));
            }
            other => panic!("unexpected: {:?}", other),
        }

        let bad_amount = content(json!({
            "transaction_id": "t1", "customer_id": "c1", "amount": "ten", "vendor_id": "v1"
        }));
        assert!(MessageKind::Transaction.validate(&bad_amount).is_err());
    }

    #[test]
    fn test_prediction_validation() {
        let ok = content(json!({"transaction_id": "t1", "prediction": true, "confidence": 0.93}));
        assert!(MessageKind::Prediction.validate(&ok).is_ok());

        let null_flag = content(json!({"transaction_id": "t1", "prediction": null, "confidence": 0.5}));
        assert!(MessageKind::Prediction.validate(&null_flag).is_err());

        // A transaction payload is not a prediction.
        let tx = content(json!({
            "transaction_id": "t1", "customer_id": "c1", "amount": 10, "vendor_id": "v1"
        }));
        assert!(MessageKind::Prediction.validate(&tx).is_err());
    }

    #[test]
    fn test_queue_names() {
        assert!(is_valid_queue_name("orders"));
        assert!(is_valid_queue_name("Orders2"));
        assert!(!is_valid_queue_name(""));
        assert!(!is_valid_queue_name("my-queue"));
        assert!(!is_valid_queue_name("../etc"));
        assert!(!is_valid_queue_name("with space"));
        assert!(!is_valid_queue_name("Metadata"));
        assert!(!is_valid_queue_name("zürich"));
        assert!(!is_valid_queue_name("队列"));
    }

    #[test]
    fn test_roles() {
        assert!(ActorRole::Admin.can_administer());
        assert!(!ActorRole::Agent.can_administer());
        assert!(ActorRole::Agent.can_write());
        assert!(!ActorRole::User.can_write());
    }

    #[test]
    fn test_message_ids_unique() {
        let a = Message::new(Content::new(), MessageKind::Transaction);
        let b = Message::new(Content::new(), MessageKind::Transaction);
        assert_ne!(a.id, b.id);
    }
}
