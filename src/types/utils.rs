//! Shared utility functions for JSON handling and text windows.
//!
//! ## JSON Extraction Helpers
//!
//! - `json_string` - Extract strings
//! - `as_number` - Interpret numbers, accepting numeric strings

// =============================================================================
// JSON Value Extraction Helpers
// =============================================================================

/// Extract string from JSON value by key.
#[inline]
pub fn json_string(value: &serde_json::Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(String::from)
}

/// Interpret a JSON value as a number; numeric strings are parsed.
pub fn as_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
}

// =============================================================================
// String Utilities
// =============================================================================

/// First `max_chars` characters of `s` (char-boundary safe).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text window of `radius` characters on each side of `start..end` (byte offsets).
///
/// Offsets must lie on char boundaries, which is always true for regex matches.
pub fn text_window(text: &str, start: usize, end: usize, radius: usize) -> String {
    let window_start = text[..start]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let window_start = if radius == 0 { start } else { window_start };

    let window_end = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(idx, _)| end + idx)
        .unwrap_or(text.len());

    collapse_whitespace(&text[window_start..window_end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_number_accepts_strings() {
        assert_eq!(as_number(&json!("85")), Some(85.0));
        assert_eq!(as_number(&json!(" 7,5 ")), Some(7.5));
        assert_eq!(as_number(&json!(0.9)), Some(0.9));
        assert_eq!(as_number(&json!("alto")), None);
        assert_eq!(as_number(&json!(null)), None);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("Ivã dormiu", 3), "Ivã");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_text_window_radius() {
        let text = "aaaaa MATCH bbbbb";
        let start = text.find("MATCH").unwrap();
        let end = start + "MATCH".len();
        assert_eq!(text_window(text, start, end, 2), "a MATCH b");
        assert_eq!(text_window(text, start, end, 100), text);
    }

    #[test]
    fn test_text_window_non_ascii_boundaries() {
        let text = "ção ção Ivã dormiu ção ção";
        let start = text.find("Ivã").unwrap();
        let end = start + "Ivã dormiu".len();
        let window = text_window(text, start, end, 4);
        assert_eq!(window, "ção Ivã dormiu ção");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  "), "a b");
    }
}
