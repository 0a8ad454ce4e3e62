//! Core module - messages, queues and the queue registry.
//!
//! - Typed messages and content validation
//! - Bounded FIFO queues with a per-queue guard
//! - The registry coordinating push, pull and snapshots

pub mod manager;
pub mod message;
pub mod queue;

pub use manager::{LoadReport, PersistReport, QueueManager, DEFAULT_CAPACITY};
pub use message::{ActorRole, Content, Message, MessageKind};
pub use queue::{Queue, QueueInfo};
