//! HTTP/SSE server for the Reflow backend.
//!
//! ```text
//! +--------------------------------------------------------------+
//! |  Axum HTTP Server (/api)                                     |
//! |  /health (GET)                       -> health check         |
//! |  /sessions (GET, POST)               -> list / create        |
//! |  /sessions/import (POST)             -> archive import       |
//! |  /sessions/{id} (GET, PATCH, DELETE) -> session CRUD         |
//! |  /sessions/{id}/pages (POST)         -> page upload          |
//! |  /sessions/{id}/pages/reorder (POST) -> page reorder         |
//! |  /sessions/{id}/pages/{pid} (DELETE) -> page removal         |
//! |  /sessions/{id}/archive (GET)        -> archive download     |
//! |  /sessions/{id}/document (GET)       -> recognized document  |
//! |  /sessions/{id}/export (POST)        -> rendered download    |
//! |  /sessions/{id}/events (GET)         -> SSE progress feed    |
//! |  /sessions/{id}/recognize (POST)     -> start pipeline task  |
//! +--------------------------------------------------------------+
//!          |                    |
//!          v                    v
//!   SessionStore          TaskManager + EventBroker
//! ```

mod handlers;
pub mod types;

pub use handlers::AppState;
pub use types::{ErrorResponse, ExportPayload, HealthResponse, RecognizeResponse, ReorderRequest};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Start the HTTP server on `port` (0 picks a random free port).
///
/// Returns the bound address and a token that triggers graceful shutdown.
pub async fn start_server(
    port: u16,
    state: Arc<AppState>,
) -> anyhow::Result<(SocketAddr, CancellationToken)> {
    let shutdown_token = CancellationToken::new();
    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("HTTP server listening on {}", actual_addr);

    let server_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_token))
}

/// Create the router with all routes configured.
///
/// Separated from `start_server` so tests can drive it without a socket.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/sessions", get(handlers::list_sessions))
        .route("/api/sessions", post(handlers::create_session))
        .route("/api/sessions/import", post(handlers::import_archive))
        .route("/api/sessions/{session_id}", get(handlers::get_session))
        .route("/api/sessions/{session_id}", patch(handlers::update_session))
        .route("/api/sessions/{session_id}", delete(handlers::delete_session))
        .route("/api/sessions/{session_id}/pages", post(handlers::upload_pages))
        .route(
            "/api/sessions/{session_id}/pages/reorder",
            post(handlers::reorder_pages),
        )
        .route(
            "/api/sessions/{session_id}/pages/{page_id}",
            delete(handlers::delete_page),
        )
        .route(
            "/api/sessions/{session_id}/archive",
            get(handlers::download_archive),
        )
        .route(
            "/api/sessions/{session_id}/document",
            get(handlers::get_document),
        )
        .route(
            "/api/sessions/{session_id}/export",
            post(handlers::export_document),
        )
        .route(
            "/api/sessions/{session_id}/events",
            get(handlers::session_events),
        )
        .route(
            "/api/sessions/{session_id}/recognize",
            post(handlers::recognize_session),
        )
        .with_state(state)
}
