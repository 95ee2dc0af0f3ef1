//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Agent lifecycle
        .route("/agents", post(handlers::agent::create_agent))
        .route("/agents", get(handlers::agent::list_agents))
        .route("/agents/import", post(handlers::agent::import_agent))
        .route("/agents/{id}", get(handlers::agent::get_agent))
        .route("/agents/{id}", put(handlers::agent::update_agent))
        .route("/agents/{id}", delete(handlers::agent::delete_agent))
        .route("/agents/{id}/export", get(handlers::agent::export_agent))
        // Chat
        .route("/agents/{id}/chat", post(handlers::chat::chat))
        .route(
            "/agents/{id}/chats/{chat_id}/messages",
            get(handlers::chat::get_messages),
        )
        // Memory administration
        .route(
            "/agents/{id}/memory/clear",
            post(handlers::agent::clear_memory),
        )
        // Quota
        .route("/agents/{id}/quota", get(handlers::quota::get_quota))
        .route("/agents/{id}/quota/limits", put(handlers::quota::set_limits));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
