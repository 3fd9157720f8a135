//! API route definitions.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::{middleware as axum_middleware, Router};

use super::handlers::{self, SharedState};
use super::middleware::require_auth;

/// Assembles the full router: a public health endpoint plus the
/// bearer-authenticated API surface.
pub fn create_router(state: SharedState) -> Router {
    let authed = Router::new()
        .route("/api/ingest", post(handlers::ingest))
        .route("/api/ingest/batch", post(handlers::ingest_batch))
        .route("/api/ingest/:job_id/status", get(handlers::ingest_status))
        .route("/api/stats/llm", get(handlers::llm_stats))
        .route("/api/documents", get(handlers::list_documents))
        .route(
            "/api/documents/:doc_id",
            delete(handlers::delete_document_handler),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Uploads go through multipart; leave headroom over the file limit for
    // form overhead.
    let body_limit = state.cfg.max_upload_bytes + 1024 * 1024;

    Router::new()
        .route("/health", get(handlers::health))
        .merge(authed)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
