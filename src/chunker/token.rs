//! Cheap token estimation.

/// Estimates the token count of a piece of text.
///
/// Counts whitespace-separated words and scales by ~1.33 tokens per word.
/// Deliberately coarse — the chunker treats this as a cost function, not
/// ground truth.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let words = text.split_whitespace().count();
    let tokens = (words as f64 * 1.33).round() as usize;
    if tokens < 1 {
        1
    } else {
        tokens
    }
}
