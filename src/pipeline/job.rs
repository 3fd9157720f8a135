//! Job state, the in-memory job registry, and content hashing.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// State of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Parsing,
    Chunking,
    Extracting,
    Storing,
    Completed,
    Failed,
    Partial,
    DuplicateSkipped,
}

/// Processing progress counters. All counters are non-decreasing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Progress {
    pub total_chunks: usize,
    pub chunks_processed: usize,
    pub facts_valid: usize,
    pub facts_stored: usize,
    pub errors: Vec<String>,
}

struct JobState {
    status: JobStatus,
    phase: String,
    progress: Progress,
    content_hash: String,
    updated_at: DateTime<Utc>,
    file_data: Option<Vec<u8>>,
}

/// Tracks the state of a single document ingestion.
///
/// Identity fields are immutable; the mutable progress lives behind one
/// mutex that is only ever held for field updates, never across I/O. A
/// status endpoint reads through [`Job::snapshot`] while the owning worker
/// mutates.
pub struct Job {
    pub id: String,
    pub doc_id: String,
    pub user_id: String,
    pub filename: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    state: Mutex<JobState>,
}

impl Job {
    pub fn new(
        id: impl Into<String>,
        doc_id: impl Into<String>,
        user_id: impl Into<String>,
        filename: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            doc_id: doc_id.into(),
            user_id: user_id.into(),
            filename: filename.into(),
            title: title.into(),
            created_at: now,
            state: Mutex::new(JobState {
                status: JobStatus::Queued,
                phase: "queued".to_string(),
                progress: Progress::default(),
                content_hash: String::new(),
                updated_at: now,
                file_data: None,
            }),
        }
    }

    /// Updates status and phase atomically.
    pub fn set_status(&self, status: JobStatus, phase: &str) {
        let mut state = self.state.lock();
        state.status = status;
        state.phase = phase.to_string();
        state.updated_at = Utc::now();
    }

    /// Records an error message.
    pub fn add_error(&self, err: impl Into<String>) {
        let mut state = self.state.lock();
        state.progress.errors.push(err.into());
        state.updated_at = Utc::now();
    }

    pub fn incr_chunks_processed(&self) {
        let mut state = self.state.lock();
        state.progress.chunks_processed += 1;
        state.updated_at = Utc::now();
    }

    /// Adds to the extracted/stored fact counters.
    pub fn add_facts(&self, valid: usize, stored: usize) {
        let mut state = self.state.lock();
        state.progress.facts_valid += valid;
        state.progress.facts_stored += stored;
        state.updated_at = Utc::now();
    }

    pub fn set_total_chunks(&self, n: usize) {
        let mut state = self.state.lock();
        state.progress.total_chunks = n;
        state.updated_at = Utc::now();
    }

    pub fn set_content_hash(&self, hash: impl Into<String>) {
        let mut state = self.state.lock();
        state.content_hash = hash.into();
        state.updated_at = Utc::now();
    }

    pub fn content_hash(&self) -> String {
        self.state.lock().content_hash.clone()
    }

    pub fn status(&self) -> JobStatus {
        self.state.lock().status
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.state.lock().updated_at
    }

    /// Stashes the raw upload until the worker parses it.
    pub fn set_file_data(&self, data: Vec<u8>) {
        self.state.lock().file_data = Some(data);
    }

    /// Takes the raw upload out of the job, releasing the memory once the
    /// parse is done.
    pub fn take_file_data(&self) -> Option<Vec<u8>> {
        self.state.lock().file_data.take()
    }

    /// Deep-copied, JSON-safe view of the job. The errors list is always
    /// present, never shared with internal state.
    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.lock();
        JobSnapshot {
            job_id: self.id.clone(),
            doc_id: self.doc_id.clone(),
            user_id: self.user_id.clone(),
            status: state.status,
            phase: state.phase.clone(),
            filename: self.filename.clone(),
            title: self.title.clone(),
            progress: state.progress.clone(),
        }
    }
}

/// Read-only copy of job state for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    pub doc_id: String,
    pub user_id: String,
    pub status: JobStatus,
    pub phase: String,
    pub filename: String,
    pub title: String,
    pub progress: Progress,
}

/// Thread-safe in-memory job registry with TTL eviction.
pub struct JobStore {
    jobs: Mutex<HashMap<String, std::sync::Arc<Job>>>,
    ttl: Duration,
}

impl JobStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::hours(1)),
        }
    }

    pub fn put(&self, job: std::sync::Arc<Job>) {
        self.jobs.lock().insert(job.id.clone(), job);
    }

    pub fn get(&self, id: &str) -> Option<std::sync::Arc<Job>> {
        self.jobs.lock().get(id).cloned()
    }

    /// Removes every job whose last update is older than the TTL.
    pub fn cleanup(&self) {
        let now = Utc::now();
        self.jobs
            .lock()
            .retain(|_, job| now - job.updated_at() <= self.ttl);
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

/// SHA-256 of `data` as a lowercase hex string.
pub fn content_hash_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
