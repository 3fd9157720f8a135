//! Fact extraction: the Claude client, the fact schema and validation
//! rules, the extraction prompt, and latency telemetry.

pub mod client;
pub mod fact;
pub mod prompt;
pub mod stats;

pub use client::{ClaudeClient, ExtractError};
pub use fact::{category_info, slugify, validate_fact, CategoryInfo, Fact};
pub use prompt::{build_chunk_prompt, EXTRACTION_PROMPT};
pub use stats::{LlmStats, StatsSnapshot};
