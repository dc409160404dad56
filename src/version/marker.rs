//! Version marker extraction from plugin source text.
//!
//! Both the installed file and the remote source declare their version in a
//! documentation comment: the `version` keyword followed by whitespace and a
//! dotted-number token, typically
//!
//! ```text
//! /**
//!  * @name pawprint
//!  * @version 3.6.2
//!  */
//! ```
//!
//! The marker is the sole source of truth for comparison, so extraction is
//! deliberately narrow: the first match wins, and re-scanning the same text
//! always yields the same token.

use crate::core::ReplugError;
use crate::version::VersionString;
use regex::Regex;
use std::sync::LazyLock;

/// The `version` keyword, whitespace, then a dotted-number token.
///
/// Case-insensitive so `@Version` headers match; the leading word boundary
/// keeps tokens like `apiversion` from matching.
static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bversion\s+(\d+(?:\.\d+)*)").expect("marker pattern is valid"));

/// Extract the first version marker from `text`.
///
/// `location` is a human-readable description of what was scanned (a URL or a
/// file path) used only for error reporting.
///
/// # Errors
///
/// Returns [`ReplugError::VersionMarkerMissing`] when no marker is present.
pub fn extract_version(text: &str, location: &str) -> Result<VersionString, ReplugError> {
    let token = MARKER
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ReplugError::VersionMarkerMissing {
            location: location.to_string(),
        })?;

    VersionString::parse(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "/**\n * @name pawprint\n * @version 3.6.2\n * @author diane\n */\n";

    #[test]
    fn test_extracts_doc_comment_marker() {
        let version = extract_version(HEADER, "test").unwrap();
        assert_eq!(version.as_str(), "3.6.2");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let first = extract_version(HEADER, "test").unwrap();
        let second = extract_version(HEADER, "test").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_first_match_wins() {
        let text = "@version 1.1\nsomething\n@version 9.9\n";
        assert_eq!(extract_version(text, "test").unwrap().as_str(), "1.1");
    }

    #[test]
    fn test_case_insensitive_keyword() {
        let text = " * @Version 2.0\n";
        assert_eq!(extract_version(text, "test").unwrap().as_str(), "2.0");
    }

    #[test]
    fn test_two_component_versions() {
        let text = "@version 1.0";
        assert_eq!(extract_version(text, "test").unwrap().as_str(), "1.0");
    }

    #[test]
    fn test_missing_marker() {
        let err = extract_version("no marker here", "https://example.com/p.js").unwrap_err();
        assert!(matches!(err, ReplugError::VersionMarkerMissing { .. }));
        assert!(err.to_string().contains("https://example.com/p.js"));
    }

    #[test]
    fn test_keyword_requires_boundary() {
        assert!(extract_version("apiversion 1.2", "test").is_err());
    }
}
