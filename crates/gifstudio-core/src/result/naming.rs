//! Output file names for downloaded artifacts.

use std::time::{SystemTime, UNIX_EPOCH};

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Timestamp-based default name: `gif-<unix millis>.gif`.
pub fn generated_name() -> String {
    format!("gif-{}.gif", unix_millis())
}

const NAME_MAX: usize = 255;

fn is_replaced(c: char) -> bool {
    matches!(c, '\0' | '/' | '\\' | '_') || c.is_control() || c.is_whitespace()
}

/// Makes a user-supplied name safe to create in the download directory.
///
/// Separators, whitespace and control characters become a single `_`; leading
/// and trailing dots or underscores are dropped, so the result can never be
/// `..` or a hidden file. Long names are cut to NAME_MAX bytes.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if !is_replaced(c) {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}

/// Final name for a download: the sanitized request, or a generated one.
pub fn resolve_name(requested: Option<&str>) -> String {
    requested
        .map(sanitize_filename)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(generated_name)
}
