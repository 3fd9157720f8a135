//! The per-job ingestion pipeline.
//!
//! A worker owns one job at a time and drives it parse → content-hash →
//! dedup → chunk → extract → store → manifest/meta/hash-index → terminal
//! status, mutating the job's progress as it goes so concurrent status
//! lookups observe monotonic counters.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chunker::{chunk_tree, ChunkConfig};
use crate::doctree::{DocNode, DocTree};
use crate::extract::{build_chunk_prompt, validate_fact, ClaudeClient, ExtractError, Fact};
use crate::parser;
use crate::pathstore;

use super::job::{content_hash_hex, Job, JobStatus};
use super::retry::{backoff, is_retryable, MAX_RETRIES};
use super::storage::{self, DocumentMeta, StoreError};

/// Processes a single document job end to end.
pub struct Worker {
    claude: Arc<ClaudeClient>,
    pathstore: Arc<pathstore::Client>,
    chunk_cfg: ChunkConfig,
    max_concurrent_extract: usize,
    max_concurrent_store: usize,
}

impl Worker {
    pub fn new(
        claude: Arc<ClaudeClient>,
        pathstore: Arc<pathstore::Client>,
        chunk_cfg: ChunkConfig,
        max_concurrent_extract: usize,
        max_concurrent_store: usize,
    ) -> Self {
        Self {
            claude,
            pathstore,
            chunk_cfg,
            max_concurrent_extract: max_concurrent_extract.max(1),
            max_concurrent_store: max_concurrent_store.max(1),
        }
    }

    /// Runs the full ingest pipeline for one job.
    pub async fn process(&self, token: &CancellationToken, job: Arc<Job>) {
        let job_id = job.id.clone();
        let doc_id = job.doc_id.clone();
        let user_id = job.user_id.clone();

        // Phase 1: parse.
        job.set_status(JobStatus::Parsing, "parsing");
        let parser = match parser::for_file(&job.filename) {
            Ok(p) => p,
            Err(e) => {
                error!(job_id, error = %e, "unsupported format");
                job.add_error(e.to_string());
                job.set_status(JobStatus::Failed, "parsing");
                return;
            }
        };

        let data = job.take_file_data().unwrap_or_default();
        let mut tree = match parser.parse(&data, &job.filename) {
            Ok(t) => t,
            Err(e) => {
                error!(job_id, error = %e, "parse failed");
                job.add_error(format!("parse: {e}"));
                job.set_status(JobStatus::Failed, "parsing");
                return;
            }
        };
        drop(data);
        if !job.title.is_empty() {
            tree.title = job.title.clone();
        }

        // Content hash over the parsed text, not the raw bytes, so
        // cosmetic re-encodings of the same document still dedup.
        let parsed_text = flatten_tree_text(&tree);
        job.set_content_hash(content_hash_hex(parsed_text.as_bytes()));

        // Phase 1.5: dedup probe. A listing failure is non-fatal.
        match self.check_duplicate(&job).await {
            Err(e) => warn!(job_id, error = %e, "dedup check failed, proceeding"),
            Ok(Some(existing_doc_id)) => {
                info!(job_id, existing_doc_id, "duplicate document, skipping");
                job.set_status(JobStatus::DuplicateSkipped, "dedup");
                return;
            }
            Ok(None) => {}
        }

        // Phase 2: chunk.
        job.set_status(JobStatus::Chunking, "chunking");
        let chunks = chunk_tree(&tree, self.chunk_cfg);
        job.set_total_chunks(chunks.len());
        info!(job_id, chunks = chunks.len(), "chunked document");

        if chunks.is_empty() {
            warn!(job_id, "no chunks produced");
            job.add_error("no extractable content");
            job.set_status(JobStatus::Failed, "chunking");
            return;
        }
        let total_chunks = chunks.len();

        // Phase 3: extract facts with bounded concurrency.
        job.set_status(JobStatus::Extracting, "extracting");
        let sem = Arc::new(Semaphore::new(self.max_concurrent_extract));
        let mut tasks: JoinSet<(usize, Result<Vec<Fact>, ExtractError>)> = JoinSet::new();

        for chunk in chunks {
            let sem = sem.clone();
            let claude = self.claude.clone();
            let token = token.clone();
            let prompt = build_chunk_prompt(&tree.title, &chunk.breadcrumb, &chunk.text);
            let idx = chunk.index;

            tasks.spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore closed");
                (idx, extract_with_retry(&claude, &token, idx, &prompt).await)
            });
        }

        let mut all_facts: Vec<Fact> = Vec::new();
        let mut had_errors = false;
        while let Some(joined) = tasks.join_next().await {
            let (idx, result) = joined.expect("extraction task panicked");
            job.incr_chunks_processed();
            match result {
                Ok(facts) => {
                    for mut fact in facts {
                        if validate_fact(&mut fact) {
                            all_facts.push(fact);
                        }
                    }
                }
                Err(e) => {
                    error!(job_id, chunk = idx, error = %e, "extraction failed");
                    job.add_error(format!("chunk {idx}: {e}"));
                    had_errors = true;
                }
            }
        }

        job.add_facts(all_facts.len(), 0);
        info!(job_id, valid_facts = all_facts.len(), had_errors, "extraction complete");

        if all_facts.is_empty() && had_errors {
            job.set_status(JobStatus::Failed, "extracting");
            return;
        }

        // Phase 4: store facts with bounded concurrency.
        job.set_status(JobStatus::Storing, "storing");
        let total_facts = all_facts.len();
        let store_sem = Arc::new(Semaphore::new(self.max_concurrent_store));
        let mut store_tasks: JoinSet<Result<String, StoreError>> = JoinSet::new();

        for fact in all_facts {
            let sem = store_sem.clone();
            let ps = self.pathstore.clone();
            let token = token.clone();
            let user_id = user_id.clone();
            let doc_id = doc_id.clone();

            store_tasks.spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore closed");
                let path = tokio::select! {
                    _ = token.cancelled() => {
                        return Err(StoreError {
                            path: String::new(),
                            message: "cancelled".to_string(),
                        });
                    }
                    res = storage::store_fact(&ps, &fact, &user_id, &doc_id) => res?,
                };
                if let Err(e) =
                    storage::write_manifest_entry(&ps, &user_id, &doc_id, &path, &fact.category)
                        .await
                {
                    warn!(path, error = %e, "manifest write failed");
                }
                Ok(path)
            });
        }

        let mut stored_count = 0;
        while let Some(joined) = store_tasks.join_next().await {
            match joined.expect("store task panicked") {
                Ok(_) => stored_count += 1,
                Err(e) => {
                    error!(job_id, path = e.path, error = %e.message, "store failed");
                    job.add_error(format!("store {}: {}", e.path, e.message));
                    had_errors = true;
                }
            }
        }

        job.add_facts(0, stored_count);
        info!(job_id, stored = stored_count, total = total_facts, "storage complete");

        // Phase 5: document metadata. Failure is recorded but never demotes
        // the job past partial.
        let content_hash = job.content_hash();
        let meta = DocumentMeta {
            filename: &job.filename,
            title: &tree.title,
            content_hash: &content_hash,
            facts_stored: stored_count,
            total_chunks,
            created_at: job.created_at,
        };
        if let Err(e) = storage::write_document_meta(&self.pathstore, &user_id, &doc_id, &meta).await
        {
            error!(job_id, error = %e, "meta write failed");
            job.add_error(format!("meta: {e}"));
        }

        // Phase 6: hash index for dedup. Logged only.
        if let Err(e) = storage::write_hash_index(
            &self.pathstore,
            &user_id,
            &content_hash,
            &doc_id,
            &job.filename,
            job.created_at,
        )
        .await
        {
            error!(job_id, error = %e, "hash index write failed");
        }

        if had_errors && stored_count > 0 {
            job.set_status(JobStatus::Partial, "done");
        } else if had_errors {
            job.set_status(JobStatus::Failed, "storing");
        } else {
            job.set_status(JobStatus::Completed, "done");
        }
    }

    /// Checks whether this content hash already exists for the user.
    /// Returns the existing doc id when it does.
    async fn check_duplicate(
        &self,
        job: &Job,
    ) -> Result<Option<String>, pathstore::PathstoreError> {
        let prefix = storage::hash_index_prefix(&job.user_id, &job.content_hash());
        let children = self.pathstore.list_children(&prefix, 1).await?;
        Ok(children.first().map(|child| {
            // Pathstore returns dot-encoded key paths; the doc id is the
            // trailing segment.
            child
                .key
                .rsplit('.')
                .next()
                .unwrap_or(child.key.as_str())
                .to_string()
        }))
    }
}

/// One extraction call with up to [`MAX_RETRIES`] attempts, backing off
/// between retryable failures. Cancellation cuts both the in-flight call
/// and the backoff sleep short.
async fn extract_with_retry(
    claude: &ClaudeClient,
    token: &CancellationToken,
    chunk_idx: usize,
    prompt: &str,
) -> Result<Vec<Fact>, ExtractError> {
    let mut last_err = ExtractError::EmptyResponse;
    for attempt in 0..MAX_RETRIES {
        let result = tokio::select! {
            _ = token.cancelled() => return Err(ExtractError::Cancelled),
            res = claude.extract_facts(prompt) => res,
        };

        match result {
            Ok(facts) => return Ok(facts),
            Err(e) => {
                if !is_retryable(&e) || attempt + 1 == MAX_RETRIES {
                    return Err(e);
                }
                warn!(chunk = chunk_idx, attempt, error = %e, "retryable extraction error");
                last_err = e;
                tokio::select! {
                    _ = tokio::time::sleep(backoff(attempt)) => {}
                    _ = token.cancelled() => return Err(ExtractError::Cancelled),
                }
            }
        }
    }
    Err(last_err)
}

/// Concatenates every node's text in pre-order, joined by newlines, for
/// content hashing.
pub fn flatten_tree_text(tree: &DocTree) -> String {
    fn walk(nodes: &[DocNode], out: &mut String) {
        for node in nodes {
            if !node.text.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&node.text);
            }
            walk(&node.children, out);
        }
    }

    let mut out = String::new();
    walk(&tree.children, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_tree_text_preorder() {
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![
                DocNode {
                    title: "A".to_string(),
                    text: "alpha".to_string(),
                    children: vec![DocNode::text("nested")],
                    ..DocNode::default()
                },
                DocNode::text("beta"),
            ],
        };
        assert_eq!(flatten_tree_text(&tree), "alpha\nnested\nbeta");
    }

    #[test]
    fn test_flatten_skips_empty_container_nodes() {
        let tree = DocTree {
            title: "Doc".to_string(),
            children: vec![DocNode {
                title: "Container".to_string(),
                children: vec![DocNode::text("only leaf")],
                ..DocNode::default()
            }],
        };
        assert_eq!(flatten_tree_text(&tree), "only leaf");
    }

    #[test]
    fn test_flatten_empty_tree() {
        let tree = DocTree::default();
        assert_eq!(flatten_tree_text(&tree), "");
    }
}
