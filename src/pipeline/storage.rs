//! Storage key planning: where facts, manifests, metadata and the dedup
//! index live in pathstore, plus the inverse plan for deletion.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::extract::{category_info, slugify, Fact};
use crate::pathstore::{self, NodeRequest, PathstoreError};

use super::ulid::generate_ulid;

/// A failed fact write, carrying whatever path was planned for it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    pub path: String,
    pub message: String,
}

/// Root of one user's keyspace.
pub fn user_prefix(user_id: &str) -> String {
    format!("memory/users/{user_id}")
}

/// Document subtree for one ingested document.
pub fn doc_prefix(user_id: &str, doc_id: &str) -> String {
    format!("memory/users/{user_id}/documents/{doc_id}")
}

/// Dedup index prefix for a content hash.
pub fn hash_index_prefix(user_id: &str, content_hash: &str) -> String {
    format!("memory/users/{user_id}/documents/by_hash/{content_hash}")
}

/// Trailing path segment of a fact path.
///
/// Fact paths are produced only by [`plan_fact_path`], which always ends
/// them with a freshly generated ULID; manifest keys are derived from that
/// segment rather than regenerated.
pub fn fact_ulid(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Plans the pathstore key for a fact: the category template with its
/// `{entity}` or `{topic}` placeholder substituted (slugified, falling
/// back to "general") and a fresh ULID appended. `None` for categories
/// outside the allowed set.
pub fn plan_fact_path(fact: &Fact, user_id: &str) -> Option<String> {
    let info = category_info(&fact.category)?;
    let prefix = user_prefix(user_id);

    let filled = match fact.category.as_str() {
        "entity_fact" | "preference" => {
            let mut entity = slugify(&fact.entity);
            if entity.is_empty() {
                entity = "general".to_string();
            }
            info.path_template.replacen("{entity}", &entity, 1)
        }
        _ => {
            let topic = fact
                .topics
                .iter()
                .map(|t| slugify(t))
                .find(|s| !s.is_empty())
                .unwrap_or_else(|| "general".to_string());
            info.path_template.replacen("{topic}", &topic, 1)
        }
    };

    Some(format!("{prefix}/{filled}/{}", generate_ulid()))
}

/// Writes a single fact node and returns the path used.
pub async fn store_fact(
    ps: &pathstore::Client,
    fact: &Fact,
    user_id: &str,
    doc_id: &str,
) -> Result<String, StoreError> {
    let info = category_info(&fact.category).ok_or_else(|| StoreError {
        path: String::new(),
        message: format!("unknown category: {}", fact.category),
    })?;
    let path = plan_fact_path(fact, user_id).ok_or_else(|| StoreError {
        path: String::new(),
        message: format!("unknown category: {}", fact.category),
    })?;

    let topics: Vec<String> = fact
        .topics
        .iter()
        .map(|t| slugify(t))
        .filter(|s| !s.is_empty())
        .collect();

    let salience = if fact.salience == 0.0 {
        info.default_salience
    } else {
        fact.salience
    };

    let req = NodeRequest {
        value: json!({
            "text": fact.text,
            "entity": fact.entity,
            "topics": topics,
            "min_trust": fact.min_trust,
            "source": {
                "type": "document",
                "doc_id": doc_id,
            },
        }),
        memory_type: Some(info.memory_type.to_string()),
        salience: Some(salience),
        source: Some(format!("docgest:{doc_id}")),
        ..NodeRequest::default()
    };

    ps.put_node(&path, &req).await.map_err(|e| StoreError {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(path)
}

/// Writes the manifest entry that lets deletion find this fact later.
pub async fn write_manifest_entry(
    ps: &pathstore::Client,
    user_id: &str,
    doc_id: &str,
    fact_path: &str,
    category: &str,
) -> Result<(), PathstoreError> {
    let key = format!(
        "{}/facts/{}",
        doc_prefix(user_id, doc_id),
        fact_ulid(fact_path)
    );
    ps.put_node(
        &key,
        &NodeRequest {
            value: json!({
                "path": fact_path,
                "category": category,
            }),
            memory_type: Some("metacognitive".to_string()),
            salience: Some(0.1),
            source: Some(format!("docgest:{doc_id}")),
            ..NodeRequest::default()
        },
    )
    .await
}

/// Per-document metadata node.
pub struct DocumentMeta<'a> {
    pub filename: &'a str,
    pub title: &'a str,
    pub content_hash: &'a str,
    pub facts_stored: usize,
    pub total_chunks: usize,
    pub created_at: DateTime<Utc>,
}

pub async fn write_document_meta(
    ps: &pathstore::Client,
    user_id: &str,
    doc_id: &str,
    meta: &DocumentMeta<'_>,
) -> Result<(), PathstoreError> {
    let key = format!("{}/meta", doc_prefix(user_id, doc_id));
    ps.put_node(
        &key,
        &NodeRequest {
            value: json!({
                "filename": meta.filename,
                "title": meta.title,
                "content_hash": meta.content_hash,
                "facts_stored": meta.facts_stored,
                "total_chunks": meta.total_chunks,
                "created_at": meta.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
            memory_type: Some("metacognitive".to_string()),
            salience: Some(0.5),
            source: Some(format!("docgest:{doc_id}")),
            ..NodeRequest::default()
        },
    )
    .await
}

/// Hash-index entry that lets later submissions of identical bytes
/// short-circuit.
pub async fn write_hash_index(
    ps: &pathstore::Client,
    user_id: &str,
    content_hash: &str,
    doc_id: &str,
    filename: &str,
    created_at: DateTime<Utc>,
) -> Result<(), PathstoreError> {
    let key = format!("{}/{doc_id}", hash_index_prefix(user_id, content_hash));
    ps.put_node(
        &key,
        &NodeRequest {
            value: json!({
                "filename": filename,
                "created_at": created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
            memory_type: Some("metacognitive".to_string()),
            salience: Some(0.1),
            source: Some(format!("docgest:{doc_id}")),
            ..NodeRequest::default()
        },
    )
    .await
}

/// Outcome of the inverse plan.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DeleteOutcome {
    pub facts_deleted: usize,
    pub missing_fact_paths: usize,
    pub manifest_deleted: usize,
}

/// Deletes a document and everything it caused to be written: each fact
/// referenced by the manifest, the document subtree, and the hash-index
/// entry. Missing fact targets are counted but tolerated — orphaned
/// manifest entries must not block deletion.
pub async fn delete_document(
    ps: &pathstore::Client,
    user_id: &str,
    doc_id: &str,
) -> Result<DeleteOutcome, PathstoreError> {
    let doc_prefix = doc_prefix(user_id, doc_id);
    let mut outcome = DeleteOutcome::default();

    // The meta node holds the content hash needed for the hash-index
    // cleanup; read it before the subtree goes away.
    let content_hash = match ps.get_node(&format!("{doc_prefix}/meta")).await {
        Ok(Some(meta)) => meta
            .value
            .get("content_hash")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        Ok(None) => None,
        Err(e) => {
            warn!(doc_id, error = %e, "meta read failed during delete");
            None
        }
    };

    let manifest = ps
        .list_children(&format!("{doc_prefix}/facts"), 10_000)
        .await?;

    for entry in manifest {
        let Some(fact_path) = entry.value.get("path").and_then(|v| v.as_str()) else {
            continue;
        };
        match ps.delete_node(fact_path, false).await {
            Ok(()) => outcome.facts_deleted += 1,
            Err(_) => outcome.missing_fact_paths += 1,
        }
    }

    if ps.delete_node(&doc_prefix, true).await.is_ok() {
        outcome.manifest_deleted = 1;
    }

    if let Some(hash) = content_hash {
        let hash_key = format!("{}/{doc_id}", hash_index_prefix(user_id, &hash));
        if let Err(e) = ps.delete_node(&hash_key, false).await {
            warn!(doc_id, error = %e, "hash index delete failed");
        }
    }

    Ok(outcome)
}
