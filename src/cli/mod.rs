//! CLI commands for the queue service using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{load_settings_from, Settings, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
use crate::core::QueueManager;
use crate::persistence::{PersistenceDaemon, SnapshotStore};
use crate::web::auth::AuthConfig;
use crate::web::server::shutdown_signal;
use crate::web::{run_server, AppState, WebServerConfig};

/// Queue Service - multi-queue message broker with periodic snapshots.
#[derive(Parser)]
#[command(name = "queue-service")]
#[command(version)]
#[command(about = "Message queue service with role-gated push/pull and disk snapshots", long_about = None)]
pub struct Commands {
    /// Settings file
    #[arg(long, global = true, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Snapshot directory
        #[arg(long)]
        storage: Option<PathBuf>,
    },

    /// Show the queues stored in a snapshot directory
    Inspect {
        /// Snapshot directory
        #[arg(long)]
        storage: Option<PathBuf>,
    },

    /// Print the effective settings
    Config,
}

impl Commands {
    /// Load settings, falling back to defaults when the file is unusable.
    pub fn settings(&self) -> Settings {
        let mut settings = load_settings_from(&self.config).unwrap_or_else(|e| {
            eprintln!("Error loading configuration: {}", e);
            eprintln!("Using default configuration");
            Settings::default()
        });

        match &self.command {
            Command::Serve { host, port, storage } => {
                if let Some(host) = host {
                    settings.host = host.clone();
                }
                if let Some(port) = port {
                    settings.port = *port;
                }
                if let Some(storage) = storage {
                    settings.storage_path = storage.clone();
                }
            }
            Command::Inspect { storage: Some(storage) } => {
                settings.storage_path = storage.clone();
            }
            _ => {}
        }
        settings
    }

    /// Run the command.
    pub async fn run(&self, settings: Settings) -> Result<()> {
        match &self.command {
            Command::Serve { .. } => cmd_serve(settings).await,
            Command::Inspect { .. } => cmd_inspect(settings).await,
            Command::Config => cmd_config(&settings),
        }
    }
}

// Command implementations

async fn cmd_serve(settings: Settings) -> Result<()> {
    tracing::info!("Queue Service starting up...");

    let store = SnapshotStore::new(&settings.storage_path);
    let capacity = settings.max_messages_per_queue;
    let (manager, report) =
        tokio::task::spawn_blocking(move || QueueManager::open(store, capacity)).await?;
    for warning in &report.warnings {
        tracing::warn!("Snapshot load: {}", warning);
    }

    let auth = Arc::new(AuthConfig::from_settings(&settings)?);
    let daemon = PersistenceDaemon::spawn(
        manager.clone(),
        Duration::from_secs(settings.persist_interval_seconds),
    );

    let config = WebServerConfig {
        host: settings.host.clone(),
        port: settings.port,
    };
    let state = AppState { manager, auth };
    let served = run_server(config, state, shutdown_signal()).await;

    let report = daemon.shutdown().await;
    tracing::info!(
        "Queue data persisted ({} queues, {} messages), shutting down...",
        report.queues_written,
        report.messages_written
    );

    served?;
    Ok(())
}

async fn cmd_inspect(settings: Settings) -> Result<()> {
    let store = SnapshotStore::new(&settings.storage_path);
    let capacity = settings.max_messages_per_queue;
    let (manager, report) =
        tokio::task::spawn_blocking(move || QueueManager::open(store, capacity)).await?;

    let queues = manager.list_queues();
    println!(
        "Queues in {} ({}):",
        settings.storage_path.display(),
        queues.len()
    );
    for info in queues {
        println!(
            "  {:<20} {:<12} {:>6}/{:<6} modified {}",
            info.name,
            info.kind,
            info.message_count,
            info.capacity,
            info.last_modified.format("%Y-%m-%d %H:%M:%S")
        );
    }
    for warning in report.warnings {
        println!("  warning: {}", warning);
    }
    Ok(())
}

fn cmd_config(settings: &Settings) -> Result<()> {
    let mut shown = settings.clone();
    shown.jwt_secret_key = "********".to_string();
    for user in shown.users.values_mut() {
        user.password = "********".to_string();
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{ActorRole, MessageKind};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn serve_flags_override_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("config.json");
        std::fs::write(&config, r#"{"port": 9000, "host": "0.0.0.0"}"#).unwrap();

        let args = Commands::parse_from([
            "queue-service",
            "--config",
            config.to_str().unwrap(),
            "serve",
            "--port",
            "8100",
        ]);
        let settings = args.settings();
        assert_eq!(settings.port, 8100);
        assert_eq!(settings.host, "0.0.0.0");
    }

    #[test]
    fn broken_config_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("config.json");
        std::fs::write(&config, "{ nope").unwrap();

        let args = Commands::parse_from(["queue-service", "--config", config.to_str().unwrap(), "config"]);
        assert_eq!(args.settings().port, 7500);
    }

    #[tokio::test]
    async fn inspect_reads_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let manager = QueueManager::new(SnapshotStore::new(temp_dir.path()), 5);
        manager.create_queue("orders", MessageKind::Transaction, None).unwrap();
        let content = json!({"transaction_id": "t1", "customer_id": "c1", "amount": 1, "vendor_id": "v1"});
        manager
            .push("orders", content.as_object().cloned().unwrap(), "transaction", ActorRole::Agent)
            .unwrap();
        manager.persist_all();

        let settings = Settings {
            storage_path: temp_dir.path().to_path_buf(),
            ..Settings::default()
        };
        assert!(cmd_inspect(settings).await.is_ok());
    }
}
