//! API request/response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extract::StatsSnapshot;
use crate::pipeline::{JobStatus, Progress};

// ============================================================================
// Health
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub queue_depth: usize,
}

// ============================================================================
// Ingest
// ============================================================================

/// Returned with 202 Accepted when a job enters the queue.
#[derive(Serialize)]
pub struct IngestAccepted {
    pub job_id: String,
    pub doc_id: String,
    pub status: JobStatus,
    pub poll_url: String,
}

/// Status endpoint payload.
#[derive(Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub doc_id: String,
    pub status: JobStatus,
    pub phase: String,
    pub progress: Progress,
}

/// One file's outcome in a batch submission.
#[derive(Serialize)]
pub struct BatchItem {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub jobs: Vec<BatchItem>,
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Serialize)]
pub struct LlmStatsResponse {
    pub model: String,
    pub stats: StatsSnapshot,
}

// ============================================================================
// Documents
// ============================================================================

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct DocumentEntry {
    pub key: String,
    pub value: Value,
}

#[derive(Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentEntry>,
}
