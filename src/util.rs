//! Shared utility functions used across the codebase.

/// Find the largest valid UTF-8 char boundary at or before `pos`.
///
/// Polyfill for `str::floor_char_boundary` (nightly-only). Use when
/// truncating strings by byte position to avoid panicking on multi-byte
/// characters.
pub fn floor_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let mut i = pos;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Cut an API error body down to `max_bytes`, marking the cut.
pub fn truncate_body(body: &str, max_bytes: usize) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= max_bytes {
        return trimmed.to_string();
    }
    let end = floor_char_boundary(trimmed, max_bytes);
    format!("{}... ({} bytes total)", &trimmed[..end], trimmed.len())
}
