//! On-disk snapshot format.
//!
//! Layout of the storage directory:
//! - metadata.json : queue name -> queue record
//! - <name>.json   : ordered message list, oldest first

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::message::{Content, Message, MessageKind};
use crate::error::QueueError;

/// Metadata file name.
pub const METADATA_FILE: &str = "metadata.json";

/// Per-queue entry of the metadata file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QueueRecord {
    #[serde(default)]
    pub message_count: usize,

    /// Missing or unrecognized values load as transaction queues.
    #[serde(default)]
    pub queue_type: Option<String>,

    #[serde(default, alias = "max_messages")]
    pub capacity: Option<usize>,

    #[serde(default, with = "iso8601::option")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "iso8601::option")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// One message as stored in a queue file.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MessageRecord {
    pub id: String,
    pub content: Content,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub kind: Option<MessageKind>,
}

impl From<&Message> for MessageRecord {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
            kind: Some(message.kind),
        }
    }
}

impl MessageRecord {
    /// Convert back, filling a missing kind from the owning queue.
    pub fn into_message(self, queue_kind: MessageKind) -> Message {
        Message {
            id: self.id,
            content: self.content,
            timestamp: self.timestamp,
            kind: self.kind.unwrap_or(queue_kind),
        }
    }
}

/// Reads and writes snapshot files. Owns the storage directory.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    /// Serializes snapshot writes against queue file removal.
    io_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            io_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    pub fn queue_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Ensure the storage directory exists.
    pub fn ensure_dir(&self) -> Result<(), QueueError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
            tracing::debug!("Created storage directory: {}", self.dir.display());
        }
        Ok(())
    }

    pub(crate) fn lock_io(&self) -> MutexGuard<'_, ()> {
        self.io_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the metadata file as raw per-queue entries.
    ///
    /// Returns `Ok(None)` when no snapshot exists yet.
    pub fn read_metadata(&self) -> Result<Option<BTreeMap<String, Value>>, QueueError> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| corruption(&path, e))?;
        let entries = serde_json::from_str(&content).map_err(|e| corruption(&path, e))?;
        Ok(Some(entries))
    }

    /// Read a queue's message list. `Ok(None)` when the file is absent.
    pub fn read_queue(&self, name: &str) -> Result<Option<Vec<MessageRecord>>, QueueError> {
        let path = self.queue_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| corruption(&path, e))?;
        let records = serde_json::from_str(&content).map_err(|e| corruption(&path, e))?;
        Ok(Some(records))
    }

    pub fn write_queue(&self, name: &str, messages: &[Message]) -> Result<(), QueueError> {
        let records: Vec<MessageRecord> = messages.iter().map(MessageRecord::from).collect();
        let path = self.queue_path(name);
        let content = serde_json::to_vec_pretty(&records).map_err(|e| io_error(&path, e))?;
        write_atomic(&path, &content).map_err(|e| io_error(&path, e))
    }

    pub fn write_metadata(&self, records: &BTreeMap<String, QueueRecord>) -> Result<(), QueueError> {
        let path = self.metadata_path();
        let content = serde_json::to_vec_pretty(records).map_err(|e| io_error(&path, e))?;
        write_atomic(&path, &content).map_err(|e| io_error(&path, e))
    }

    /// Remove a queue's file and its metadata entry. Caller holds the I/O lock.
    pub(crate) fn forget(&self, name: &str) -> Result<(), QueueError> {
        let path = self.queue_path(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| io_error(&path, e))?;
            tracing::debug!("Removed queue file {}", path.display());
        }

        let Some(mut entries) = self.read_metadata()? else {
            return Ok(());
        };
        if entries.remove(name).is_some() {
            let path = self.metadata_path();
            let content = serde_json::to_vec_pretty(&entries).map_err(|e| io_error(&path, e))?;
            write_atomic(&path, &content).map_err(|e| io_error(&path, e))?;
        }
        Ok(())
    }
}

/// Write to a temporary sibling, sync, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

fn io_error(path: &Path, err: impl std::fmt::Display) -> QueueError {
    QueueError::PersistenceIo {
        target: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn corruption(path: &Path, err: impl std::fmt::Display) -> QueueError {
    QueueError::LoadCorruption {
        target: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// ISO-8601 timestamps. Writes RFC 3339; reads RFC 3339 or naive (UTC) values.
pub(crate) mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse(&raw).map(Some).map_err(de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
