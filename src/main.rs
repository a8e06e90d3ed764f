//! Papershelf - a personal bookshelf for research papers.
//!
//! This is the main entry point for the shelf web server.
//! The application is organized into the following modules:
//!
//! - `models`: Papers, metadata records, and the filter selection state
//! - `ingest`: Analyzer client and the metadata ingestion pipeline
//! - `shelf`: Collection storage, legacy upgrade, and duplicate admission
//! - `taxonomy`: Topic/sub-topic/tag counts derived from the collection
//! - `filter`: Selection resolution into the visible, ordered paper list
//! - `templates`: HTML rendering
//! - `handlers`: HTTP route handlers for the browse surface

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use papershelf::{handlers, ingest, AppState, BIND_ADDR};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("papershelf=info")),
        )
        .init();

    let state = Arc::new(AppState::new());

    let app = Router::new()
        // Shelf views
        .route("/", get(handlers::index))
        .route("/api/shelf", get(handlers::shelf_api))
        // Selection
        .route("/api/selection", post(handlers::set_selection))
        // Ingestion
        .route("/api/papers", post(ingest::add_paper))
        .route("/api/papers/upload", post(ingest::upload_paper))
        // Paper mutation
        .route(
            "/api/paper/{id}",
            post(handlers::update_paper).delete(handlers::delete_paper),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(BIND_ADDR)
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("papershelf running at http://{}", BIND_ADDR);
    axum::serve(listener, app).await.expect("Server error");
}
