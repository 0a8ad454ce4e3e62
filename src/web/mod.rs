//! Web server module (Axum + API).

pub mod api;
pub mod auth;
pub mod router;
pub mod server;

use std::sync::Arc;

use crate::core::QueueManager;
use auth::AuthConfig;

pub use server::{run_server, WebServerConfig};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<QueueManager>,
    pub auth: Arc<AuthConfig>,
}
