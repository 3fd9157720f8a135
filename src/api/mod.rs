//! HTTP REST API built with Axum:
//! - `GET /health` — liveness and queue depth
//! - `POST /api/ingest` — submit one document (multipart)
//! - `GET /api/ingest/{job_id}/status` — poll job progress
//! - `POST /api/ingest/batch` — submit several documents
//! - `GET /api/stats/llm` — LLM latency telemetry
//! - `GET /api/documents` — list a user's ingested documents
//! - `DELETE /api/documents/{doc_id}` — delete a document and its facts

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{AppState, SharedState};
pub use routes::create_router;
