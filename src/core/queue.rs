//! A single bounded FIFO queue.
//!
//! The message sequence sits behind the queue's guard (a mutex). The message
//! count and last-modified time are mirrored into a separate stats lock while
//! the guard is held, so metadata readers never wait on a push or pull in
//! progress and always see both values from the same mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};

use super::message::{Content, Message, MessageKind};
use crate::error::QueueError;

/// Queue metadata as seen by callers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueueInfo {
    pub name: String,
    pub kind: MessageKind,
    pub capacity: usize,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// State guarded by the queue's lock.
#[derive(Debug)]
struct QueueState {
    messages: VecDeque<Message>,
    /// Set once the queue is removed from the registry.
    retired: bool,
}

/// Count and modification time, always updated together.
#[derive(Debug, Clone, Copy)]
struct QueueStats {
    message_count: usize,
    last_modified: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Queue {
    name: String,
    kind: MessageKind,
    capacity: usize,
    created_at: DateTime<Utc>,
    state: Mutex<QueueState>,
    stats: RwLock<QueueStats>,
}

impl Queue {
    /// Create an empty queue.
    pub fn new(name: &str, kind: MessageKind, capacity: usize) -> Self {
        let now = Utc::now();
        Self::restore(name, kind, capacity, now, now, Vec::new())
    }

    /// Rebuild a queue from snapshot data, preserving ids and order.
    pub fn restore(
        name: &str,
        kind: MessageKind,
        capacity: usize,
        created_at: DateTime<Utc>,
        last_modified: DateTime<Utc>,
        messages: Vec<Message>,
    ) -> Self {
        let count = messages.len();
        Self {
            name: name.to_string(),
            kind,
            capacity,
            created_at,
            state: Mutex::new(QueueState {
                messages: messages.into(),
                retired: false,
            }),
            stats: RwLock::new(QueueStats {
                message_count: count,
                last_modified,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.stats().message_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.stats().last_modified
    }

    /// Metadata snapshot without taking the guard.
    pub fn info(&self) -> QueueInfo {
        let stats = self.stats();
        QueueInfo {
            name: self.name.clone(),
            kind: self.kind,
            capacity: self.capacity,
            message_count: stats.message_count,
            created_at: self.created_at,
            last_modified: stats.last_modified,
        }
    }

    /// Append a message of this queue's kind. Content must already be validated.
    pub(crate) fn push(&self, content: Content) -> Result<Message, QueueError> {
        let mut state = self.lock();
        if state.retired {
            return Err(QueueError::NotFound(self.name.clone()));
        }
        if state.messages.len() >= self.capacity {
            return Err(QueueError::QueueFull {
                queue: self.name.clone(),
                capacity: self.capacity,
            });
        }

        let message = Message::new(content, self.kind);
        state.messages.push_back(message.clone());
        self.touch(state.messages.len());
        Ok(message)
    }

    /// Remove and return the oldest message.
    pub(crate) fn pull(&self) -> Result<Message, QueueError> {
        let mut state = self.lock();
        if state.retired {
            return Err(QueueError::NotFound(self.name.clone()));
        }
        let message = state
            .messages
            .pop_front()
            .ok_or_else(|| QueueError::Empty(self.name.clone()))?;
        self.touch(state.messages.len());
        Ok(message)
    }

    /// Point-in-time copy of the messages, or `None` once retired.
    pub(crate) fn snapshot(&self) -> Option<Vec<Message>> {
        let state = self.lock();
        if state.retired {
            return None;
        }
        Some(state.messages.iter().cloned().collect())
    }

    /// Mark the queue as removed. Pushes and pulls fail with `NotFound` afterwards.
    pub(crate) fn retire(&self) {
        let mut state = self.lock();
        state.retired = true;
        state.messages.clear();
        self.write_stats().message_count = 0;
    }

    fn touch(&self, len: usize) {
        *self.write_stats() = QueueStats {
            message_count: len,
            last_modified: Utc::now(),
        };
    }

    fn stats(&self) -> QueueStats {
        *self.stats.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_stats(&self) -> RwLockWriteGuard<'_, QueueStats> {
        self.stats.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // State is never left half-updated, so a poisoned guard is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tx(id: &str) -> Content {
        json!({"transaction_id": id, "customer_id": "c1", "amount": 10, "vendor_id": "v1"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let queue = Queue::new("orders", MessageKind::Transaction, 10);
        for id in ["a", "b", "c"] {
            queue.push(tx(id)).unwrap();
        }

        let pulled: Vec<String> = (0..3)
            .map(|_| queue.pull().unwrap().content["transaction_id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(pulled, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_capacity_bound() {
        let queue = Queue::new("orders", MessageKind::Transaction, 2);
        queue.push(tx("a")).unwrap();
        queue.push(tx("b")).unwrap();
        assert_eq!(
            queue.push(tx("c")),
            Err(QueueError::QueueFull { queue: "orders".to_string(), capacity: 2 })
        );
        assert_eq!(queue.len(), 2);

        queue.pull().unwrap();
        assert!(queue.push(tx("c")).is_ok());
    }

    #[test]
    fn test_empty_pull_does_not_mutate() {
        let queue = Queue::new("orders", MessageKind::Transaction, 2);
        let before = queue.info();
        for _ in 0..3 {
            assert_eq!(queue.pull(), Err(QueueError::Empty("orders".to_string())));
        }
        assert_eq!(queue.info(), before);
    }

    #[test]
    fn test_push_updates_metadata() {
        let queue = Queue::new("orders", MessageKind::Transaction, 2);
        let created = queue.info().last_modified;
        let message = queue.push(tx("a")).unwrap();

        let info = queue.info();
        assert_eq!(info.message_count, 1);
        assert!(info.last_modified >= created);
        assert_eq!(message.kind, MessageKind::Transaction);
    }

    #[test]
    fn test_retired_queue_rejects_operations() {
        let queue = Queue::new("orders", MessageKind::Transaction, 2);
        queue.push(tx("a")).unwrap();
        queue.retire();

        assert_eq!(queue.push(tx("b")), Err(QueueError::NotFound("orders".to_string())));
        assert_eq!(queue.pull(), Err(QueueError::NotFound("orders".to_string())));
        assert!(queue.snapshot().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_restore_preserves_ids() {
        let messages = vec![
            Message::new(tx("a"), MessageKind::Transaction),
            Message::new(tx("b"), MessageKind::Transaction),
        ];
        let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        let now = Utc::now();
        let queue = Queue::restore("orders", MessageKind::Transaction, 5, now, now, messages);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pull().unwrap().id, ids[0]);
        assert_eq!(queue.pull().unwrap().id, ids[1]);
    }

    #[test]
    fn test_info_never_shows_partial_update() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let queue = Arc::new(Queue::new("orders", MessageKind::Transaction, 10_000));
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let queue = queue.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut previous = queue.info();
                while !done.load(Ordering::Acquire) {
                    let current = queue.info();
                    if current.message_count == previous.message_count {
                        assert_eq!(current.last_modified, previous.last_modified);
                    } else {
                        assert!(current.message_count > previous.message_count);
                        assert!(current.last_modified >= previous.last_modified);
                    }
                    previous = current;
                }
            })
        };

        for i in 0..5_000 {
            queue.push(tx(&i.to_string())).unwrap();
        }
        done.store(true, Ordering::Release);
        reader.join().unwrap();
        assert_eq!(queue.len(), 5_000);
    }
}
