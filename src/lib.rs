//! Queue service library root.
//!
//! An in-process message broker: named FIFO queues of typed JSON messages,
//! bounded capacity, role-gated access and periodic snapshots to disk.

pub mod audit;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod web;

pub use audit::{AuditRecord, AuditSink, TracingAuditSink};
pub use cli::Commands;
pub use config::{load_settings_from, Settings};
pub use crate::core::{ActorRole, Message, MessageKind, QueueInfo, QueueManager};
pub use error::{Error, QueueError, Result};
pub use persistence::{PersistenceDaemon, SnapshotStore};
pub use web::run_server;
