//! Shared helpers and constants.

use chrono::Utc;

pub const APP_NAME: &str = "skiff_backend";

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Normalizes an optional form field: trims it and maps empty to `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Cuts a description down to a listing preview, respecting char boundaries.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut} …")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_drops_blank() {
        assert_eq!(non_empty(Some("  x  ".into())), Some("x".to_string()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 100), "short");
        let long = "é".repeat(120);
        let cut = preview(&long, 100);
        assert!(cut.ends_with(" …"));
        assert_eq!(cut.chars().count(), 102);
    }
}
