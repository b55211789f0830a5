use std::sync::LazyLock;

use regex::Regex;

static SPECIAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\s]").unwrap());
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+").unwrap());

/// Anything outside `[A-Za-z0-9\s]` breaks the text-search syntax, so such
/// queries only go through exact lookups.
pub fn has_special_characters(input: &str) -> bool {
    SPECIAL.is_match(input)
}

pub fn tokens(input: &str) -> Vec<String> {
    TOKEN
        .find_iter(input)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Blank strings from the backend count as missing.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{has_special_characters, present, tokens};

    #[test]
    fn test_special_characters() {
        assert!(has_special_characters("DRP-1234"));
        assert!(has_special_characters("vitamin c!"));
        assert!(has_special_characters("café"));
        assert!(!has_special_characters("paracetamol 500"));
        assert!(!has_special_characters("FR 0001\t"));
    }

    #[test]
    fn test_tokens() {
        assert_eq!(tokens("  Biogesic 500mg "), vec!["biogesic", "500mg"]);
        assert_eq!(tokens("UNILAB, Inc."), vec!["unilab", "inc"]);
        assert!(tokens("   ").is_empty());
    }

    #[test]
    fn test_present() {
        assert_eq!(present(&Some("  Acme ".to_string())), Some("Acme"));
        assert_eq!(present(&Some("   ".to_string())), None);
        assert_eq!(present(&None), None);
    }
}
