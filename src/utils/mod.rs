//! Small text helpers shared by logging and reporting.

/// Cut `s` to at most `max` characters, appending `...` when anything was dropped.
///
/// Counts chars, not bytes, so multi-byte text is never split mid-character.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Collapse a possibly multi-line message onto one line.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
