//! API request handlers.

use std::path::Path as FilePath;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::extract::ClaudeClient;
use crate::parser;
use crate::pipeline::{content_hash_hex, delete_document, DeleteOutcome, Job, Orchestrator};

use super::error::{ApiError, ApiResult};
use super::types::*;

/// Application state shared across handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub claude: Arc<ClaudeClient>,
    pub cfg: Config,
}

pub type SharedState = Arc<AppState>;

// ============================================================================
// Health
// ============================================================================

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        queue_depth: state.orchestrator.queue_depth(),
    })
}

// ============================================================================
// Ingest
// ============================================================================

struct UploadedFile {
    filename: String,
    data: Vec<u8>,
}

/// Accepts one document (multipart: `file`, `user_id`; optional `doc_id`,
/// `title`) and queues it for ingestion.
pub async fn ingest(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<IngestAccepted>)> {
    let mut file: Option<UploadedFile> = None;
    let mut user_id = String::new();
    let mut doc_id = String::new();
    let mut title = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename =
                    sanitize_filename(field.file_name().unwrap_or("unnamed"));
                let data = field.bytes().await?;
                file = Some(UploadedFile {
                    filename,
                    data: data.to_vec(),
                });
            }
            Some("user_id") => user_id = field.text().await?.trim().to_string(),
            Some("doc_id") => doc_id = field.text().await?.trim().to_string(),
            Some("title") => title = field.text().await?.trim().to_string(),
            _ => {}
        }
    }

    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    let file = file.ok_or_else(|| ApiError::BadRequest("file is required".to_string()))?;
    check_upload(&state.cfg, &file)?;

    let job = build_job(&user_id, &doc_id, &title, file);
    state
        .orchestrator
        .submit(job.clone())
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;

    info!(job_id = job.id, doc_id = job.doc_id, user_id, "job queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestAccepted {
            poll_url: format!("/api/ingest/{}/status", job.id),
            job_id: job.id.clone(),
            doc_id: job.doc_id.clone(),
            status: job.status(),
        }),
    ))
}

/// Read-only job status lookup.
pub async fn ingest_status(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let job = state
        .orchestrator
        .get_job(&job_id)
        .ok_or_else(|| ApiError::NotFound("job not found".to_string()))?;

    let snap = job.snapshot();
    Ok(Json(StatusResponse {
        job_id: snap.job_id,
        doc_id: snap.doc_id,
        status: snap.status,
        phase: snap.phase,
        progress: snap.progress,
    }))
}

/// Accepts several documents at once (multipart: repeated `files` fields
/// plus `user_id`). Always 202; per-file failures are reported inline.
pub async fn ingest_batch(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<BatchResponse>)> {
    let mut files: Vec<UploadedFile> = Vec::new();
    let mut user_id = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("files") => {
                let filename =
                    sanitize_filename(field.file_name().unwrap_or("unnamed"));
                let data = field.bytes().await?;
                files.push(UploadedFile {
                    filename,
                    data: data.to_vec(),
                });
            }
            Some("user_id") => user_id = field.text().await?.trim().to_string(),
            _ => {}
        }
    }

    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    if files.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one file is required".to_string(),
        ));
    }

    let mut jobs = Vec::with_capacity(files.len());
    for file in files {
        let filename = file.filename.clone();
        if let Err(e) = check_upload(&state.cfg, &file) {
            jobs.push(batch_error(filename, e.to_string()));
            continue;
        }

        let job = build_job(&user_id, "", "", file);
        match state.orchestrator.submit(job.clone()) {
            Ok(()) => jobs.push(BatchItem {
                filename,
                job_id: Some(job.id.clone()),
                doc_id: Some(job.doc_id.clone()),
                status: Some(job.status()),
                poll_url: Some(format!("/api/ingest/{}/status", job.id)),
                error: None,
            }),
            Err(e) => jobs.push(batch_error(filename, e.to_string())),
        }
    }

    Ok((StatusCode::ACCEPTED, Json(BatchResponse { jobs })))
}

fn check_upload(cfg: &Config, file: &UploadedFile) -> ApiResult<()> {
    if !parser::is_supported_extension(&file.filename) {
        let ext = FilePath::new(&file.filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        return Err(ApiError::BadRequest(format!(
            "unsupported file type: {ext}"
        )));
    }
    if file.data.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }
    if file.data.len() > cfg.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "file exceeds max size ({} bytes)",
            cfg.max_upload_bytes
        )));
    }
    Ok(())
}

fn build_job(user_id: &str, doc_id: &str, title: &str, file: UploadedFile) -> Arc<Job> {
    let doc_id = if doc_id.is_empty() {
        content_hash_hex(&file.data)[..16].to_string()
    } else {
        doc_id.to_string()
    };
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let job_id =
        content_hash_hex(format!("{user_id}-{}-{nanos}", file.filename).as_bytes())[..20]
            .to_string();

    let job = Arc::new(Job::new(job_id, doc_id, user_id, file.filename, title));
    job.set_file_data(file.data);
    job
}

fn batch_error(filename: String, error: String) -> BatchItem {
    BatchItem {
        filename,
        job_id: None,
        doc_id: None,
        status: None,
        poll_url: None,
        error: Some(error),
    }
}

/// Strips path components from an uploaded filename.
fn sanitize_filename(name: &str) -> String {
    let base = FilePath::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned = base.replace(['/', '\\'], "_").replace("..", "_");
    if cleaned.is_empty() || cleaned == "." {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

// ============================================================================
// LLM stats
// ============================================================================

pub async fn llm_stats(State(state): State<SharedState>) -> Json<LlmStatsResponse> {
    Json(LlmStatsResponse {
        model: state.claude.model().to_string(),
        stats: state.claude.stats.snapshot(),
    })
}

// ============================================================================
// Documents
// ============================================================================

/// Lists a user's ingested documents by their meta nodes.
pub async fn list_documents(
    State(state): State<SharedState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<DocumentsResponse>> {
    let user_id = query
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id query parameter is required".to_string()))?;

    let prefix = format!("memory/users/{user_id}/documents");
    let children = state
        .orchestrator
        .pathstore()
        .list_children(&prefix, 200)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to list documents: {e}")))?;

    let documents = children
        .into_iter()
        .filter(|child| child.key.contains(".meta"))
        .map(|child| DocumentEntry {
            key: child.key,
            value: child.value,
        })
        .collect();

    Ok(Json(DocumentsResponse { documents }))
}

/// Deletes a document and every fact it caused to be written.
pub async fn delete_document_handler(
    State(state): State<SharedState>,
    Path(doc_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<DeleteOutcome>> {
    let user_id = query
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id query parameter is required".to_string()))?;

    let outcome = delete_document(state.orchestrator.pathstore(), &user_id, &doc_id)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to delete document: {e}")))?;

    info!(doc_id, user_id, facts_deleted = outcome.facts_deleted, "document deleted");
    Ok(Json(outcome))
}
