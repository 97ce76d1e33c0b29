//! Cache key identity

use std::fmt;
use std::sync::Arc;

/// Number of SQL characters shown by the `Display` form
const PREVIEW_CHARS: usize = 48;

/// Identity of a cached statement: the exact SQL text plus the comment mode
/// it was parsed with.
///
/// No normalization is applied; texts differing only in whitespace or case are
/// distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    sql: Arc<str>,
    parse_comments: bool,
}

impl CacheKey {
    pub fn new(sql: impl Into<Arc<str>>, parse_comments: bool) -> Self {
        Self {
            sql: sql.into(),
            parse_comments,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub const fn parse_comments(&self) -> bool {
        self.parse_comments
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.parse_comments { "comments" } else { "plain" };
        match self.sql.char_indices().nth(PREVIEW_CHARS) {
            Some((cut, _)) => write!(f, "{mode}:{}…", &self.sql[..cut]),
            None => write!(f, "{mode}:{}", self.sql),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_is_significant() {
        let a = CacheKey::new("SELECT 1", false);
        let b = CacheKey::new("SELECT  1", false);
        assert_ne!(a, b);
    }

    #[test]
    fn test_case_is_significant() {
        assert_ne!(
            CacheKey::new("select 1", false),
            CacheKey::new("SELECT 1", false)
        );
    }

    #[test]
    fn test_comment_mode_is_part_of_identity() {
        assert_ne!(
            CacheKey::new("SELECT 1", true),
            CacheKey::new("SELECT 1", false)
        );
    }

    #[test]
    fn test_accessors() {
        let key = CacheKey::new("SELECT 1 /* hint */", true);
        assert_eq!(key.sql(), "SELECT 1 /* hint */");
        assert!(key.parse_comments());
    }

    #[test]
    fn test_display_short_sql() {
        let key = CacheKey::new("SELECT 1", false);
        assert_eq!(key.to_string(), "plain:SELECT 1");
    }

    #[test]
    fn test_display_truncates_long_sql() {
        let sql = format!("SELECT {} FROM t", "a, ".repeat(40));
        let key = CacheKey::new(sql.as_str(), true);
        let shown = key.to_string();

        assert!(shown.starts_with("comments:SELECT a, a,"));
        assert!(shown.ends_with('…'));
        assert_eq!(shown.chars().count(), "comments:".len() + PREVIEW_CHARS + 1);
    }

    #[test]
    fn test_display_truncates_on_char_boundary() {
        let sql = "é".repeat(100);
        let key = CacheKey::new(sql.as_str(), false);
        assert!(key.to_string().ends_with("é…"));
    }

    #[test]
    fn test_empty_sql_is_a_valid_key() {
        let key = CacheKey::new("", false);
        assert_eq!(key.sql(), "");
        assert_eq!(key.to_string(), "plain:");
    }
}
