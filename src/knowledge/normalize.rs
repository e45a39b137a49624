//! Text canonicalization for question matching.

use std::sync::OnceLock;

use regex::Regex;

/// Characters that are neither alphanumeric nor whitespace.
fn non_word() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\p{Alphabetic}\p{N}\s]").expect("static regex"))
}

/// Lowercase `text` and strip everything that is not alphanumeric or whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    non_word()
        .replace_all(&text.to_lowercase(), "")
        .into_owned()
}

/// Whether `text` still carries any content after normalization.
#[must_use]
pub fn is_meaningful(text: &str) -> bool {
    !normalize(text).trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("Hello, World!"), normalize("hello world"));
    }

    #[test]
    fn test_keeps_digits_and_whitespace() {
        assert_eq!(normalize("Route 66?\tYes."), "route 66\tyes");
    }

    #[test]
    fn test_unicode_letters_survive() {
        assert_eq!(normalize("¿Qué TAL?"), "qué tal");
    }

    #[test]
    fn test_all_punctuation_is_empty() {
        assert_eq!(normalize("?!...,;"), "");
        assert!(!is_meaningful("?!"));
        assert!(!is_meaningful("   "));
        assert!(is_meaningful("hi!"));
    }

    #[test]
    fn test_idempotent() {
        for s in [
            "Hello, World!",
            "What's   UP?",
            "İstanbul",
            "snake_case-and-dashes",
            "",
            "ÅNGSTRÖM №5",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }
}
