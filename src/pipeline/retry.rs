//! Retry policy for transient extraction failures.

use std::time::Duration;

use rand::Rng;

use crate::extract::ExtractError;

/// Total attempts per extraction call, including the first.
pub const MAX_RETRIES: u32 = 3;

/// True if an error is worth retrying.
pub fn is_retryable(err: &ExtractError) -> bool {
    err.is_retryable()
}

/// Backoff duration for attempt `n` (0-indexed): `min(2^n, 30)` seconds
/// plus uniform jitter in `[0, base/2)`.
pub fn backoff(attempt: u32) -> Duration {
    let base_secs = (1u64 << attempt.min(5)).min(30);
    let base_ms = base_secs * 1000;
    let jitter_ms = rand::thread_rng().gen_range(0..base_ms / 2);
    Duration::from_millis(base_ms + jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_within_bounds() {
        for attempt in 0..8 {
            let base = (1u64 << attempt.min(5)).min(30);
            for _ in 0..50 {
                let d = backoff(attempt);
                assert!(d >= Duration::from_secs(base), "attempt {attempt}: {d:?}");
                assert!(
                    d < Duration::from_millis(base * 1500),
                    "attempt {attempt}: {d:?}"
                );
            }
        }
    }

    #[test]
    fn test_backoff_caps_at_thirty_seconds() {
        for _ in 0..20 {
            let d = backoff(10);
            assert!(d >= Duration::from_secs(30));
            assert!(d < Duration::from_secs(45));
        }
    }

    #[test]
    fn test_is_retryable_matches_error_taxonomy() {
        assert!(is_retryable(&ExtractError::Retryable {
            status: 500,
            body: String::new()
        }));
        assert!(is_retryable(&ExtractError::Timeout));
        assert!(!is_retryable(&ExtractError::EmptyResponse));
    }
}
