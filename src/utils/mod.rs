//! Common utilities and helper functions
//!
//! Keyword normalisation and token matching shared by the estimators,
//! generators and sync layer.

pub mod error;
pub mod retry;

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use self::error::ValidationError;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Normalize a caller-supplied keyword, rejecting empty input
pub fn normalize_keyword(keyword: &str) -> Result<String, ValidationError> {
    let normalized = normalize_whitespace(keyword);
    if normalized.is_empty() {
        return Err(ValidationError::EmptyKeyword);
    }
    Ok(normalized)
}

/// Normalize a keyword list, dropping blank entries
pub fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Result<Vec<String>, ValidationError> {
    let normalized: Vec<String> = keywords
        .iter()
        .map(|k| normalize_whitespace(k.as_ref()))
        .filter(|k| !k.is_empty())
        .collect();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyKeywordList);
    }
    Ok(normalized)
}

/// Whitespace-separated words of a keyword
pub fn words(keyword: &str) -> Vec<&str> {
    keyword.split_whitespace().collect()
}

/// Number of whitespace-separated words
pub fn word_count(keyword: &str) -> usize {
    keyword.split_whitespace().count()
}

/// True if any token occurs as a substring of the lowercased keyword
pub fn contains_any<S: AsRef<str>>(keyword: &str, tokens: &[S]) -> bool {
    let lower = keyword.to_lowercase();
    tokens
        .iter()
        .any(|t| !t.as_ref().is_empty() && lower.contains(&t.as_ref().to_lowercase()))
}

/// Number of tokens occurring in the lowercased keyword
pub fn count_matches<S: AsRef<str>>(keyword: &str, tokens: &[S]) -> usize {
    let lower = keyword.to_lowercase();
    tokens
        .iter()
        .filter(|t| !t.as_ref().is_empty() && lower.contains(&t.as_ref().to_lowercase()))
        .count()
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Stable 64-bit digest of a keyword, used to derive per-keyword RNG seeds
pub fn keyword_seed(keyword: &str) -> u64 {
    let digest = Sha256::digest(keyword.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world  "), "hello world");
        assert_eq!(normalize_whitespace("hello\n\nworld"), "hello world");
    }

    #[test]
    fn test_normalize_keyword_rejects_blank() {
        assert!(matches!(
            normalize_keyword("   \t "),
            Err(ValidationError::EmptyKeyword)
        ));
        assert_eq!(normalize_keyword(" python  tutorial ").unwrap(), "python tutorial");
    }

    #[test]
    fn test_normalize_keywords_drops_blank_entries() {
        let list = normalize_keywords(&["rust", " ", "  async  rust "]).unwrap();
        assert_eq!(list, vec!["rust", "async rust"]);
        assert!(normalize_keywords(&["", "  "]).is_err());
    }

    #[test]
    fn test_token_matching_is_case_insensitive_substring() {
        assert!(contains_any("Best Rust Books", &["best"]));
        assert!(contains_any("유튜브 채널 추천", &["추천"]));
        assert!(!contains_any("rust", &["python"]));
        assert_eq!(count_matches("how to buy the best laptop", &["buy", "best", "price"]), 2);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.234_567), 1.23);
        assert_eq!(round2(2.005_1), 2.01);
    }

    #[test]
    fn test_keyword_seed_is_stable() {
        assert_eq!(keyword_seed("rust"), keyword_seed("rust"));
        assert_ne!(keyword_seed("rust"), keyword_seed("python"));
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("very long text here", 10), "very lo...");
        assert_eq!(truncate_text("한국어 키워드 분석기", 6), "한국어...");
    }
}
