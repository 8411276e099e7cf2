//! Glob patterns over cache keys.
//!
//! Only `*` is special; it matches zero or more characters, newlines
//! included. Every other character matches itself. Patterns are anchored to the whole key.

use regex::Regex;

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether `key` matches the pattern from start to end.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The glob text this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Translate a glob into an anchored regular expression where `.` also
/// matches `\n`.
pub fn glob_to_regex(pattern: &str) -> String {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    format!("(?s)^{body}$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_regex_escapes_metacharacters() {
        assert_eq!(glob_to_regex("posts:list:*"), "(?s)^posts:list:.*$");
        assert_eq!(glob_to_regex("a.b?"), r"(?s)^a\.b\?$");
    }

    #[test]
    fn test_trailing_wildcard() {
        let pattern = GlobPattern::new("posts:list:*").unwrap();
        assert!(pattern.matches("posts:list:page=0"));
        assert!(pattern.matches("posts:list:"));
        assert!(!pattern.matches("post:abc"));
    }

    #[test]
    fn test_anchored_at_both_ends() {
        let pattern = GlobPattern::new("post:abc").unwrap();
        assert!(pattern.matches("post:abc"));
        assert!(!pattern.matches("post:abcdef"));
        assert!(!pattern.matches("xpost:abc"));
    }

    #[test]
    fn test_inner_wildcard() {
        let pattern = GlobPattern::new("followers:user:*:limit=20*").unwrap();
        assert!(pattern.matches("followers:user:42:limit=20&page=1"));
        assert!(!pattern.matches("following:user:42:limit=20&page=1"));
    }

    #[test]
    fn test_dot_is_literal() {
        let pattern = GlobPattern::new("creator:a.b").unwrap();
        assert!(!pattern.matches("creator:axb"));
    }

    #[test]
    fn test_wildcard_spans_newlines() {
        let pattern = GlobPattern::new("creator:username:*").unwrap();
        assert!(pattern.matches("creator:username:username=a\nb"));
        assert!(pattern.matches("creator:username:\n"));
        assert!(!GlobPattern::new("post:*:x").unwrap().matches("post:a\nb:y"));
    }
}
