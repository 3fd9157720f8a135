//! The ingestion pipeline: job state, the worker pool, retry policy, ULID
//! generation and the pathstore write/delete plans.

pub mod job;
pub mod orchestrator;
pub mod retry;
pub mod storage;
pub mod ulid;
pub mod worker;

pub use job::{content_hash_hex, Job, JobSnapshot, JobStatus, JobStore, Progress};
pub use orchestrator::Orchestrator;
pub use retry::{backoff, is_retryable, MAX_RETRIES};
pub use storage::{delete_document, DeleteOutcome};
pub use ulid::generate_ulid;
pub use worker::Worker;
