//! docgest: document ingestion service.
//!
//! Documents arrive over a multipart HTTP API, are parsed into a common
//! section tree, chunked with structural context, handed to Claude for
//! fact extraction, and every validated fact is written to pathstore
//! together with a per-document manifest, metadata node and dedup index.

pub mod api;
pub mod chunker;
pub mod config;
pub mod doctree;
pub mod extract;
pub mod parser;
pub mod pathstore;
pub mod pipeline;

pub use config::Config;
pub use doctree::{Chunk, DocNode, DocTree};
pub use extract::{ClaudeClient, Fact, LlmStats};
pub use pipeline::{Job, JobSnapshot, JobStatus, Orchestrator};
