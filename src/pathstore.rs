//! HTTP client for the pathstore hierarchical key/value service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// How much of an error body gets kept for diagnostics.
const MAX_ERROR_BODY: usize = 1024;

/// Pathstore request/transport failures.
#[derive(Debug, Error)]
pub enum PathstoreError {
    #[error("{op} {key}: status {status}: {body}")]
    Status {
        op: &'static str,
        key: String,
        status: u16,
        body: String,
    },
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

/// Body for `PUT /kv/{key}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeRequest {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salience: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Response from `GET /kv/{key}`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeResponse {
    #[serde(rename = "key_path")]
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub memory_type: Option<String>,
    #[serde(default)]
    pub salience: Option<f64>,
}

/// A single node from a prefix scan.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildNode {
    #[serde(rename = "key_path")]
    pub key: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    nodes: Vec<ChildNode>,
}

/// Body for `PUT /links`.
#[derive(Debug, Clone, Serialize)]
pub struct LinkRequest {
    pub from_key: String,
    pub to_key: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidirectional: Option<bool>,
}

/// Client for the pathstore HTTP API. Cheap to clone behind an `Arc`; safe
/// for concurrent use.
pub struct Client {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http,
        }
    }

    /// Stores or updates a node at the given key.
    pub async fn put_node(&self, key: &str, req: &NodeRequest) -> Result<(), PathstoreError> {
        let response = self
            .http
            .put(format!("{}/kv/{}", self.base_url, key))
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        match response.status().as_u16() {
            200 | 201 => Ok(()),
            status => Err(status_error("put node", key, status, response).await),
        }
    }

    /// Retrieves a node by key. Absent keys come back as `Ok(None)`.
    pub async fn get_node(&self, key: &str) -> Result<Option<NodeResponse>, PathstoreError> {
        let response = self
            .http
            .get(format!("{}/kv/{}", self.base_url, key))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            200 => Ok(Some(response.json().await?)),
            404 => Ok(None),
            status => Err(status_error("get node", key, status, response).await),
        }
    }

    /// Deletes a node, optionally together with its children.
    pub async fn delete_node(&self, key: &str, recursive: bool) -> Result<(), PathstoreError> {
        let mut url = format!("{}/kv/{}", self.base_url, key);
        if recursive {
            url.push_str("?children=true");
        }
        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            200 | 204 => Ok(()),
            status => Err(status_error("delete node", key, status, response).await),
        }
    }

    /// Prefix scan under the given key.
    pub async fn list_children(
        &self,
        key: &str,
        limit: usize,
    ) -> Result<Vec<ChildNode>, PathstoreError> {
        let mut url = format!("{}/kv/{}/*", self.base_url, key);
        if limit > 0 {
            url.push_str(&format!("?limit={limit}"));
        }
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                let list: ListResponse = response.json().await?;
                Ok(list.nodes)
            }
            status => Err(status_error("list children", key, status, response).await),
        }
    }

    /// Creates or updates an edge between two nodes.
    pub async fn put_link(&self, req: &LinkRequest) -> Result<(), PathstoreError> {
        let response = self
            .http
            .put(format!("{}/links", self.base_url))
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        match response.status().as_u16() {
            200 | 201 => Ok(()),
            status => Err(status_error("put link", &req.from_key, status, response).await),
        }
    }
}

async fn status_error(
    op: &'static str,
    key: &str,
    status: u16,
    response: reqwest::Response,
) -> PathstoreError {
    let body = response.text().await.unwrap_or_default();
    let body = if body.len() > MAX_ERROR_BODY {
        let cut: String = body.chars().take(MAX_ERROR_BODY).collect();
        cut
    } else {
        body
    };
    PathstoreError::Status {
        op,
        key: key.to_string(),
        status,
        body,
    }
}
