//! Output formatting utilities

use serde_json::Value;

/// Longest file name most filesystems accept, in bytes
const MAX_FILENAME_BYTES: usize = 255;

/// Format bytes as human-readable
pub fn format_bytes(bytes: u64) -> String {
    human_bytes::human_bytes(bytes as f64)
}

/// Display title of a metadata or search record
pub fn item_title(item: &Value) -> String {
    ["title", "name", "username"]
        .iter()
        .find_map(|key| item[*key].as_str())
        .unwrap_or("Unknown")
        .to_string()
}

/// Artist (Deezer) or uploader (SoundCloud) of a record
pub fn item_artist(item: &Value) -> Option<String> {
    item["artist"]["name"]
        .as_str()
        .or_else(|| item["user"]["username"].as_str())
        .map(str::to_string)
}

pub fn item_id(item: &Value) -> String {
    match &item["id"] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "?".to_string(),
    }
}

/// Turn a title into a file name safe on every platform
///
/// German umlauts become ASCII digraphs, path separators and characters
/// Windows rejects become `_`, and with `restrict` only printable ASCII
/// survives. The stem is cut so that the whole name fits in 255 bytes.
pub fn clean_filename(stem: &str, extension: &str, restrict: bool) -> String {
    let mut cleaned = String::with_capacity(stem.len());
    for c in stem.chars() {
        match c {
            'ä' => cleaned.push_str("ae"),
            'ö' => cleaned.push_str("oe"),
            'ü' => cleaned.push_str("ue"),
            'Ä' => cleaned.push_str("Ae"),
            'Ö' => cleaned.push_str("Oe"),
            'Ü' => cleaned.push_str("Ue"),
            'ß' => cleaned.push_str("ss"),
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => cleaned.push('_'),
            c if c.is_control() => {}
            c if restrict && !(' '..='~').contains(&c) => {}
            c => cleaned.push(c),
        }
    }

    let trimmed = cleaned.trim().trim_end_matches('.');
    let stem = if trimmed.is_empty() { "untitled" } else { trimmed };

    let budget = MAX_FILENAME_BYTES.saturating_sub(extension.len() + 1);
    format!("{}.{}", truncate_bytes(stem, budget), extension)
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a char
fn truncate_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
