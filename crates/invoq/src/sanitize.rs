//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Blob keys embed tenant ids and customer filenames; spans only ever see
//! the redacted form.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Keeps the last path segment of a blob key, prefixed with a short hash of
/// the rest so related keys still correlate.
///
/// - `tenant-1/doc-9/invoice.pdf` → `3f2a…/invoice.pdf`
pub fn redact_key(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((prefix, name)) => format!("{}/{}", &hash_str(prefix)[..8], name),
        None => key.to_string(),
    }
}

/// Short deterministic hash for correlation without exposing the value.
pub fn hash_str(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Truncates free text (provider messages, descriptions) for log lines.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}
