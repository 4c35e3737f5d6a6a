//! Text helpers shared by the chat, memory and document handlers

use std::borrow::Cow;
use regex::Regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Maximum characters kept by `sanitize_input`.
pub const MAX_INPUT_CHARS: usize = 2000;

/// Maximum characters in a generated session title (before the ellipsis).
pub const MAX_TITLE_CHARS: usize = 50;

/// Title used when a session is created without one.
pub const DEFAULT_SESSION_TITLE: &str = "Neue Unterhaltung";

pub struct TextUtils;

impl TextUtils {
    /// Trim, drop angle brackets and cap the length of user-supplied text.
    pub fn sanitize_input(input: &str) -> String {
        input
            .trim()
            .chars()
            .filter(|c| *c != '<' && *c != '>')
            .take(MAX_INPUT_CHARS)
            .collect()
    }

    /// Cut to `max_chars` characters and append `...` when anything was removed.
    pub fn truncate_text(text: &str, max_chars: usize) -> Cow<'_, str> {
        match text.char_indices().nth(max_chars) {
            None => Cow::Borrowed(text),
            Some((byte_idx, _)) => {
                let mut result = String::with_capacity(byte_idx + 3);
                result.push_str(&text[..byte_idx]);
                result.push_str("...");
                Cow::Owned(result)
            }
        }
    }

    /// Session title derived from the first user message.
    pub fn generate_session_title(first_message: &str) -> String {
        let cleaned = Self::sanitize_input(first_message);
        let truncated = Self::truncate_text(&cleaned, MAX_TITLE_CHARS);

        if truncated.is_empty() {
            DEFAULT_SESSION_TITLE.to_string()
        } else {
            truncated.into_owned()
        }
    }

    pub fn is_valid_email(email: &str) -> bool {
        EMAIL_REGEX.is_match(email)
    }

    /// Human-readable size, base 1024, at most two decimals.
    pub fn format_file_size(bytes: u64) -> String {
        if bytes == 0 {
            return "0 Bytes".to_string();
        }

        const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
        let mut value = bytes as f64;
        let mut exponent = 0;
        while value >= 1024.0 && exponent < UNITS.len() - 1 {
            value /= 1024.0;
            exponent += 1;
        }

        let rounded = format!("{:.2}", value);
        let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
        format!("{} {}", trimmed, UNITS[exponent])
    }

    /// Split a comma-separated tag string, dropping blanks.
    pub fn parse_tags(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Rough token estimate (four characters per token) for stored chunks.
    pub fn estimate_tokens(text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_brackets_and_trims() {
        assert_eq!(TextUtils::sanitize_input("  <b>Hallo</b>  "), "bHallo/b");
    }

    #[test]
    fn test_sanitize_caps_length_in_characters() {
        let long = "ä".repeat(3000);
        let cleaned = TextUtils::sanitize_input(&long);
        assert_eq!(cleaned.chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(TextUtils::truncate_text("kurz", 10), "kurz");
        assert_eq!(TextUtils::truncate_text("genau", 5), "genau");
    }

    #[test]
    fn test_truncate_appends_ellipsis_on_char_boundary() {
        assert_eq!(TextUtils::truncate_text("Grüße aus Köln", 5), "Grüße...");
    }

    #[test]
    fn test_session_title_defaults_when_empty() {
        assert_eq!(TextUtils::generate_session_title("   <>  "), DEFAULT_SESSION_TITLE);
    }

    #[test]
    fn test_session_title_truncates_long_message() {
        let title = TextUtils::generate_session_title(&"a".repeat(80));
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS + 3);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_email_validation() {
        assert!(TextUtils::is_valid_email("martin@example.de"));
        assert!(!TextUtils::is_valid_email("martin@example"));
        assert!(!TextUtils::is_valid_email("mar tin@example.de"));
        assert!(!TextUtils::is_valid_email("@example.de"));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(TextUtils::format_file_size(0), "0 Bytes");
        assert_eq!(TextUtils::format_file_size(512), "512 Bytes");
        assert_eq!(TextUtils::format_file_size(1024), "1 KB");
        assert_eq!(TextUtils::format_file_size(1536), "1.5 KB");
        assert_eq!(TextUtils::format_file_size(10 * 1024 * 1024), "10 MB");
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            TextUtils::parse_tags(" ziele, ,familie ,  "),
            vec!["ziele".to_string(), "familie".to_string()]
        );
        assert!(TextUtils::parse_tags("").is_empty());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(TextUtils::estimate_tokens(""), 0);
        assert_eq!(TextUtils::estimate_tokens("abcd"), 1);
        assert_eq!(TextUtils::estimate_tokens("abcde"), 2);
    }
}
