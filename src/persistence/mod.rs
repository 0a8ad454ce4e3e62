//! Snapshot persistence: on-disk format and the background snapshot task.

pub mod daemon;
pub mod store;

pub use daemon::PersistenceDaemon;
pub use store::SnapshotStore;
