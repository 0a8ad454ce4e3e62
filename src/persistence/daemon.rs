//! Background snapshot task.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::manager::{PersistReport, QueueManager};

/// Periodically snapshots the registry until shut down.
pub struct PersistenceDaemon {
    manager: Arc<QueueManager>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PersistenceDaemon {
    /// Start the snapshot loop on the current runtime.
    pub fn spawn(manager: Arc<QueueManager>, every: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task_manager = manager.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing to save yet.
            ticker.tick().await;

            tracing::info!("Persistence daemon started (every {:?})", every);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = run_snapshot(task_manager.clone()).await {
                            tracing::error!("Snapshot task failed: {}", e);
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Persistence daemon stopping");
        });

        Self {
            manager,
            shutdown_tx,
            handle,
        }
    }

    /// Stop the loop and take one final snapshot.
    pub async fn shutdown(self) -> PersistReport {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Persistence daemon exited abnormally: {}", e);
        }

        tracing::info!("Persisting queue data before shutdown...");
        match run_snapshot(self.manager.clone()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Final snapshot task failed: {}", e);
                PersistReport::default()
            }
        }
    }
}

/// Snapshot on the blocking pool; file I/O must not stall request handlers.
async fn run_snapshot(
    manager: Arc<QueueManager>,
) -> Result<PersistReport, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || manager.persist_all()).await
}
