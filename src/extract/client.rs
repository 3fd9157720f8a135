//! Anthropic Messages API client for fact extraction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::fact::Fact;
use super::stats::LlmStats;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_TOKENS: u32 = 4096;
/// Upper bound on how much of a response body gets read.
const MAX_RESPONSE_BYTES: usize = 1 << 20;

/// Failure modes of an extraction call, split into retryable and permanent.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Transient provider failure (HTTP 429 or 5xx). Worth retrying.
    #[error("retryable error (status {status}): {body}")]
    Retryable { status: u16, body: String },

    /// Client-side timeout. Also transient.
    #[error("claude api timed out")]
    Timeout,

    /// Any other non-200 status. Permanent.
    #[error("claude api status {status}: {body}")]
    Api { status: u16, body: String },

    /// The provider returned an error envelope.
    #[error("claude error: {kind}: {message}")]
    Provider { kind: String, message: String },

    /// Response parsed but carried no content parts.
    #[error("empty response from claude")]
    EmptyResponse,

    /// Response body was not the expected shape.
    #[error("decode response: {0}")]
    Decode(String),

    /// The content text did not parse as a JSON array of facts.
    #[error("parse facts json: {message} (raw: {raw})")]
    ParseFacts { message: String, raw: String },

    /// Transport-level failure other than a timeout.
    #[error("claude api: {0}")]
    Http(#[from] reqwest::Error),

    /// The enclosing job was cancelled while this call was in flight.
    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractError {
    /// True for failures the pipeline should retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractError::Retryable { .. } | ExtractError::Timeout)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentPart>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    part_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Client for the Anthropic Messages API.
///
/// Safe for concurrent use; every call records its wall-clock duration into
/// the shared [`LlmStats`] regardless of outcome.
pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    pub stats: Arc<LlmStats>,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            stats: Arc::new(LlmStats::new(Duration::from_secs(3600))),
        }
    }

    /// Overrides the API base URL (tests point this at a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Calls Claude once to extract facts from a chunk prompt.
    pub async fn extract_facts(&self, prompt: &str) -> Result<Vec<Fact>, ExtractError> {
        let start = Instant::now();
        let result = self.do_extract(prompt).await;
        self.stats.record(start.elapsed());
        result
    }

    async fn do_extract(&self, prompt: &str) -> Result<Vec<Fact>, ExtractError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, "sending extraction request");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = read_limited(response).await?;

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ExtractError::Retryable {
                status: status.as_u16(),
                body: truncate(&String::from_utf8_lossy(&body), 200),
            });
        }
        if status.as_u16() != 200 {
            return Err(ExtractError::Api {
                status: status.as_u16(),
                body: truncate(&String::from_utf8_lossy(&body), 200),
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_slice(&body).map_err(|e| ExtractError::Decode(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(ExtractError::Provider {
                kind: err.kind,
                message: err.message,
            });
        }
        if parsed.content.is_empty() {
            return Err(ExtractError::EmptyResponse);
        }

        let text = strip_code_block(&parsed.content[0].text);
        serde_json::from_str(text).map_err(|e| ExtractError::ParseFacts {
            message: e.to_string(),
            raw: truncate(text, 200),
        })
    }
}

fn classify_transport(err: reqwest::Error) -> ExtractError {
    if err.is_timeout() {
        ExtractError::Timeout
    } else {
        ExtractError::Http(err)
    }
}

/// Reads at most [`MAX_RESPONSE_BYTES`] of the response body.
async fn read_limited(response: reqwest::Response) -> Result<Vec<u8>, ExtractError> {
    let mut out = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(piece) = stream.next().await {
        let piece = piece.map_err(classify_transport)?;
        let remaining = MAX_RESPONSE_BYTES - out.len();
        if piece.len() >= remaining {
            out.extend_from_slice(&piece[..remaining]);
            break;
        }
        out.extend_from_slice(&piece);
    }
    Ok(out)
}

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("code block pattern")
});

/// Strips an optional enclosing triple-backtick fence (optionally tagged
/// `json`) from the model's reply.
fn strip_code_block(s: &str) -> &str {
    let s = s.trim();
    match CODE_BLOCK.captures(s) {
        Some(caps) => caps.get(1).map_or(s, |m| m.as_str()),
        None => s,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}
