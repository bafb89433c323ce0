//! Utility functions and helpers

/// Truncate a string to a maximum byte length, ensuring valid UTF-8 boundaries
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len.saturating_sub(3);
        while !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        format!("{}...", &s[..end])
    }
}

/// Path segments the HTTP surface uses for its own routes
const RESERVED_SESSION_NAMES: &[&str] = &["api"];

/// Session names appear in URL paths and bridge endpoints
pub fn is_valid_session_name(name: &str) -> bool {
    !name.is_empty()
        && !RESERVED_SESSION_NAMES.contains(&name)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("test", 3), "...");
    }

    #[test]
    fn test_truncate_multibyte() {
        let s = "héllo wörld";
        let out = truncate(s, 6);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 6);
    }

    #[test]
    fn test_session_names() {
        assert!(is_valid_session_name("bot1"));
        assert!(is_valid_session_name("sales-bot_2"));
        assert!(!is_valid_session_name(""));
        assert!(!is_valid_session_name("bot/1"));
        assert!(!is_valid_session_name("bot 1"));
        assert!(!is_valid_session_name("api"));
    }
}
