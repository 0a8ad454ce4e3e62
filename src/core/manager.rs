//! Queue registry: owns every queue and coordinates push, pull and snapshots.
//!
//! Locking:
//! - the registry lock guards the name -> queue map (structural changes only)
//! - each queue guards its own message sequence
//! - the store's I/O lock serializes snapshots against deletes
//!
//! Locks are always taken in that order: I/O, registry, queue.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::message::{is_valid_queue_name, ActorRole, Content, Message, MessageKind};
use super::queue::{Queue, QueueInfo};
use crate::audit::{AuditAction, AuditRecord, AuditSink, TracingAuditSink};
use crate::error::QueueError;
use crate::persistence::store::{QueueRecord, SnapshotStore};

/// Default capacity when neither the caller nor the settings name one.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Outcome of a snapshot run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PersistReport {
    pub queues_written: usize,
    pub messages_written: usize,
    pub failures: Vec<QueueError>,
}

impl PersistReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a startup load.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadReport {
    pub queues_loaded: usize,
    pub messages_loaded: usize,
    /// Non-fatal problems; affected queues were recreated empty or skipped.
    pub warnings: Vec<QueueError>,
}

pub struct QueueManager {
    queues: RwLock<HashMap<String, Arc<Queue>>>,
    default_capacity: usize,
    store: SnapshotStore,
    audit: Arc<dyn AuditSink>,
}

impl QueueManager {
    /// Create an empty manager snapshotting into `store`.
    pub fn new(store: SnapshotStore, default_capacity: usize) -> Self {
        Self::with_audit(store, default_capacity, Arc::new(TracingAuditSink))
    }

    pub fn with_audit(
        store: SnapshotStore,
        default_capacity: usize,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            default_capacity: default_capacity.max(1),
            store,
            audit,
        }
    }

    /// Create a manager and restore the last snapshot from `store`.
    pub fn open(store: SnapshotStore, default_capacity: usize) -> (Arc<Self>, LoadReport) {
        let manager = Arc::new(Self::new(store, default_capacity));
        let report = manager.load_all();
        (manager, report)
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    /// Create an empty queue. `capacity` falls back to the configured default.
    pub fn create_queue(
        &self,
        name: &str,
        kind: MessageKind,
        capacity: Option<usize>,
    ) -> Result<QueueInfo, QueueError> {
        if !is_valid_queue_name(name) {
            return Err(QueueError::InvalidName(name.to_string()));
        }
        let capacity = capacity.unwrap_or(self.default_capacity);
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity(capacity));
        }

        let info = {
            let mut queues = self.write_queues();
            if queues.contains_key(name) {
                return Err(QueueError::AlreadyExists(name.to_string()));
            }
            let queue = Arc::new(Queue::new(name, kind, capacity));
            let info = queue.info();
            queues.insert(name.to_string(), queue);
            info
        };

        tracing::info!(queue = name, kind = %kind, capacity, "Created queue");
        Ok(info)
    }

    /// Delete a queue, its messages and its snapshot files.
    pub fn delete_queue(&self, name: &str) -> Result<(), QueueError> {
        let _io = self.store.lock_io();
        {
            let mut queues = self.write_queues();
            let queue = queues
                .remove(name)
                .ok_or_else(|| QueueError::NotFound(name.to_string()))?;
            queue.retire();
        }

        // The queue is gone from memory either way; a leftover file is
        // reported but cannot bring it back while the process runs.
        if let Err(e) = self.store.forget(name) {
            tracing::error!("Error deleting snapshot for queue '{}': {}", name, e);
        }

        tracing::info!(queue = name, "Deleted queue");
        Ok(())
    }

    /// Metadata of every queue, sorted by name.
    pub fn list_queues(&self) -> Vec<QueueInfo> {
        let mut infos: Vec<QueueInfo> = self.read_queues().values().map(|q| q.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn get_queue_info(&self, name: &str) -> Option<QueueInfo> {
        self.read_queues().get(name).map(|q| q.info())
    }

    /// Push a message and return its id.
    ///
    /// `kind` is the caller-declared message type and must match the queue.
    pub fn push(
        &self,
        name: &str,
        content: Content,
        kind: &str,
        actor_role: ActorRole,
    ) -> Result<String, QueueError> {
        let queue = self.lookup(name)?;
        let kind: MessageKind = kind.parse()?;
        if kind != queue.kind() {
            return Err(QueueError::KindMismatch {
                queue: name.to_string(),
                expected: queue.kind().to_string(),
                actual: kind.to_string(),
            });
        }
        kind.validate(&content)?;

        let message = queue.push(content)?;

        tracing::info!(queue = name, message_id = %message.id, "Pushed message");
        self.audit(name, &message, AuditAction::Push, actor_role);
        Ok(message.id)
    }

    /// Remove and return the oldest message of a queue.
    pub fn pull(&self, name: &str, actor_role: ActorRole) -> Result<Message, QueueError> {
        let queue = self.lookup(name)?;
        let message = queue.pull()?;

        tracing::info!(queue = name, message_id = %message.id, "Pulled message");
        self.audit(name, &message, AuditAction::Pull, actor_role);
        Ok(message)
    }

    /// Write every live queue and the metadata file to the store.
    ///
    /// Failures are logged and collected; they never abort the run.
    pub fn persist_all(&self) -> PersistReport {
        let _io = self.store.lock_io();
        let mut report = PersistReport::default();

        if let Err(e) = self.store.ensure_dir() {
            tracing::error!("Error preparing storage directory: {}", e);
            report.failures.push(e);
            return report;
        }

        let queues: Vec<Arc<Queue>> = self.read_queues().values().cloned().collect();
        let mut metadata = BTreeMap::new();

        for queue in queues {
            // Copied under the guard, serialized outside it.
            let Some(messages) = queue.snapshot() else {
                continue;
            };
            let info = queue.info();

            match self.store.write_queue(queue.name(), &messages) {
                Ok(()) => {
                    report.queues_written += 1;
                    report.messages_written += messages.len();
                    tracing::debug!("Persisted {} messages for queue {}", messages.len(), info.name);
                }
                Err(e) => {
                    tracing::error!("Error persisting messages for queue {}: {}", info.name, e);
                    report.failures.push(e);
                }
            }

            metadata.insert(
                info.name.clone(),
                QueueRecord {
                    message_count: messages.len(),
                    queue_type: Some(info.kind.to_string()),
                    capacity: Some(info.capacity),
                    created_at: Some(info.created_at),
                    last_modified: Some(info.last_modified),
                },
            );
        }

        if let Err(e) = self.store.write_metadata(&metadata) {
            tracing::error!("Error persisting queue metadata: {}", e);
            report.failures.push(e);
        }

        tracing::info!(
            queues = report.queues_written,
            messages = report.messages_written,
            failures = report.failures.len(),
            "Snapshot complete"
        );
        report
    }

    /// Restore queues from the store. Never fails: problems degrade to
    /// empty or skipped queues and are returned as warnings.
    pub fn load_all(&self) -> LoadReport {
        let _io = self.store.lock_io();
        let mut report = LoadReport::default();

        if let Err(e) = self.store.ensure_dir() {
            tracing::warn!("Storage directory unavailable: {}", e);
            report.warnings.push(e);
            return report;
        }

        let entries = match self.store.read_metadata() {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                tracing::info!("No snapshot found in {}", self.store.dir().display());
                return report;
            }
            Err(e) => {
                tracing::error!("Error loading queue metadata: {}", e);
                report.warnings.push(e);
                return report;
            }
        };

        for (name, raw) in entries {
            if !is_valid_queue_name(&name) {
                tracing::warn!("Skipping snapshot entry with invalid queue name '{}'", name);
                report.warnings.push(QueueError::InvalidName(name));
                continue;
            }
            let record: QueueRecord = match serde_json::from_value(raw) {
                Ok(record) => record,
                Err(e) => {
                    let err = QueueError::LoadCorruption {
                        target: name.clone(),
                        reason: e.to_string(),
                    };
                    tracing::warn!("Skipping queue '{}': {}", name, err);
                    report.warnings.push(err);
                    continue;
                }
            };

            let queue = self.restore_queue(&name, record, &mut report);
            report.queues_loaded += 1;
            report.messages_loaded += queue.len();
            tracing::info!("Loaded {} messages for queue {}", queue.len(), name);
            if let Some(replaced) = self.write_queues().insert(name, Arc::new(queue)) {
                replaced.retire();
            }
        }

        tracing::info!("Loaded {} queues from persistent storage", report.queues_loaded);
        report
    }

    fn restore_queue(&self, name: &str, record: QueueRecord, report: &mut LoadReport) -> Queue {
        let kind = match record.queue_type.as_deref() {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "Queue '{}' has unknown type '{}', loading as transaction",
                    name,
                    raw
                );
                MessageKind::Transaction
            }),
            None => MessageKind::Transaction,
        };
        let mut capacity = record
            .capacity
            .filter(|c| *c > 0)
            .unwrap_or(self.default_capacity);
        let now = Utc::now();
        let created_at = record.created_at.unwrap_or(now);
        let last_modified = record.last_modified.unwrap_or(created_at);

        let messages: Vec<Message> = match self.store.read_queue(name) {
            Ok(Some(records)) => records.into_iter().map(|r| r.into_message(kind)).collect(),
            Ok(None) => {
                if record.message_count > 0 {
                    let err = QueueError::LoadCorruption {
                        target: name.to_string(),
                        reason: format!(
                            "message file missing, {} messages lost",
                            record.message_count
                        ),
                    };
                    tracing::warn!("Recreating queue '{}' empty: {}", name, err);
                    report.warnings.push(err);
                }
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Recreating queue '{}' empty: {}", name, e);
                report.warnings.push(e);
                Vec::new()
            }
        };

        if messages.len() > capacity {
            tracing::warn!(
                "Queue '{}' holds {} messages over capacity {}, raising capacity",
                name,
                messages.len(),
                capacity
            );
            capacity = messages.len();
        }

        Queue::restore(name, kind, capacity, created_at, last_modified, messages)
    }

    fn lookup(&self, name: &str) -> Result<Arc<Queue>, QueueError> {
        self.read_queues()
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(name.to_string()))
    }

    fn audit(&self, name: &str, message: &Message, action: AuditAction, actor_role: ActorRole) {
        let record = AuditRecord {
            queue: name.to_string(),
            message_id: message.id.clone(),
            kind: message.kind,
            content: message.content.clone(),
            action,
            actor_role,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.audit.record(&record) {
            tracing::warn!("Audit record for {} on '{}' not written: {}", action, name, e);
        }
    }

    fn read_queues(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Queue>>> {
        self.queues.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_queues(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Queue>>> {
        self.queues.write().unwrap_or_else(PoisonError::into_inner)
    }
}
