//! Request middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::handlers::SharedState;

/// Validates the caller's bearer token against the configured API key.
/// The comparison is constant-time so the key can't be probed byte by
/// byte.
pub async fn require_auth(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
    let matches: bool = token
        .as_bytes()
        .ct_eq(state.cfg.docgest_api_key.as_bytes())
        .into();
    if token.is_empty() || !matches {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
