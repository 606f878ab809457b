//! Helpers for bounding subprocess output before it reaches task logs,
//! error messages or tracing span attributes.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Used for span fields so traces do not carry absolute paths.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Truncates `text` to at most `max_chars` characters, respecting UTF-8
/// boundaries.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Returns the last `count` non-blank lines of `text`, oldest first.
pub fn tail_lines(text: &str, count: usize) -> Vec<String> {
    let mut lines: Vec<String> = text
        .lines()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .take(count)
        .map(|line| line.trim_end().to_string())
        .collect();
    lines.reverse();
    lines
}
