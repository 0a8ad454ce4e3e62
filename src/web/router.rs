//! Route definitions for web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::api;
use super::AppState;

/// Create the queue API router.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        // Queues
        .route("/queues", get(api::list_queues).post(api::create_queue))
        .route("/queues/:name", get(api::get_queue).delete(api::delete_queue))
        // Messages
        .route("/queues/:name/push", post(api::push_message))
        .route("/queues/:name/pull", get(api::pull_message))
        // Operator
        .route("/admin/persist", post(api::persist_now))
}

/// Create the full app router.
pub fn create_app_router(state: AppState) -> Router {
    Router::new()
        .merge(create_api_router())
        .route("/token", post(api::login_for_access_token))
        .route("/health", get(api::health_check))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
