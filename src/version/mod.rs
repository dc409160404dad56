//! Version parsing and comparison for dotted-integer version strings.
//!
//! Plugin versions in this domain are dot-separated sequences of non-negative
//! integers with no fixed arity: `"1.0"`, `"3.6.2"`, and `"9"` are all valid.
//! Comparison is purely numeric, component-wise, left-to-right, padding the
//! shorter sequence with zeros - so `"1.2"` equals `"1.2.0"` and `"1.10"` is
//! greater than `"1.9"` (numeric, not lexicographic).
//!
//! This grammar is deliberately looser than semver: there is no
//! major/minor/patch contract, no pre-release tags, and two-component
//! versions are the common case in the wild. [`VersionString`] keeps the raw
//! text for display and a normalized component vector for ordering.
//!
//! # Examples
//!
//! ```rust
//! use replug::version::VersionString;
//! use std::cmp::Ordering;
//!
//! # fn example() -> anyhow::Result<()> {
//! let local: VersionString = "1.2".parse()?;
//! let remote: VersionString = "1.10".parse()?;
//!
//! assert_eq!(local.cmp(&remote), Ordering::Less);
//! assert_eq!(local, "1.2.0".parse::<VersionString>()?);
//! # Ok(())
//! # }
//! ```

pub mod marker;

use crate::core::ReplugError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A dotted-integer version string with component-wise numeric ordering.
///
/// The raw input text is preserved for display; ordering and equality are
/// computed on the parsed components with trailing zeros stripped, which is
/// equivalent to zero-padding the shorter side during comparison.
///
/// Parsing fails only on empty or blank input - the one case the update
/// machinery must treat as indeterminate and skip. Non-numeric tokens inside
/// an otherwise non-empty string parse as 0, matching the forgiving behavior
/// version markers need in the wild.
#[derive(Debug, Clone)]
pub struct VersionString {
    raw: String,
    components: Vec<u64>,
}

impl VersionString {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns [`ReplugError::EmptyVersion`] if the input is empty or only
    /// whitespace. The caller must treat the comparison as indeterminate and
    /// skip the update cycle.
    pub fn parse(input: &str) -> Result<Self, ReplugError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ReplugError::EmptyVersion);
        }

        let mut components: Vec<u64> = trimmed
            .split('.')
            .map(|token| token.trim().parse::<u64>().unwrap_or(0))
            .collect();

        // Trailing zeros carry no ordering information: "1.2.0" == "1.2".
        while components.len() > 1 && components.last() == Some(&0) {
            components.pop();
        }

        Ok(Self {
            raw: trimmed.to_string(),
            components,
        })
    }

    /// The normalized numeric components (trailing zeros stripped).
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// The raw version text as it appeared in the source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `self` is strictly newer than `other`.
    #[must_use]
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self > other
    }
}

impl FromStr for VersionString {
    type Err = ReplugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for VersionString {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for VersionString {}

impl Ord for VersionString {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic order over trimmed component vectors is exactly the
        // zero-padded component-wise comparison: a shorter prefix only loses
        // to a longer vector whose extra components are non-zero, and those
        // were the only ones not stripped.
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for VersionString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two version strings, parsing both.
///
/// Convenience for call sites that hold raw text. Returns
/// [`Ordering::Greater`] when `a` is newer than `b`.
///
/// # Errors
///
/// Fails if either string is empty; the caller must treat the comparison as
/// indeterminate and skip the update.
pub fn compare(a: &str, b: &str) -> Result<Ordering, ReplugError> {
    let a = VersionString::parse(a)?;
    let b = VersionString::parse(b)?;
    Ok(a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionString {
        VersionString::parse(s).unwrap()
    }

    #[test]
    fn test_missing_trailing_components_are_zero() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("1.2"), v("1.2.0.0"));
        assert_eq!(v("3"), v("3.0.0"));
    }

    #[test]
    fn test_first_unequal_component_decides() {
        assert_eq!(compare("2.0", "1.9.9").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.9.9", "2.0").unwrap(), Ordering::Less);
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert_eq!(compare("1.10", "1.9").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.100", "1.99").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_reflexivity() {
        for s in ["3.6.2", "1.0", "0", "10.0.0.1"] {
            assert_eq!(compare(s, s).unwrap(), Ordering::Equal);
        }
    }

    #[test]
    fn test_antisymmetry() {
        let pairs = [
            ("1.2", "1.2.0"),
            ("2.0", "1.9.9"),
            ("1.10", "1.9"),
            ("0.1", "0.0.9"),
            ("9", "10"),
        ];
        for (a, b) in pairs {
            let forward = compare(a, b).unwrap();
            let backward = compare(b, a).unwrap();
            assert_eq!(forward, backward.reverse(), "{a} vs {b}");
        }
    }

    #[test]
    fn test_empty_is_indeterminate() {
        assert!(matches!(
            VersionString::parse(""),
            Err(ReplugError::EmptyVersion)
        ));
        assert!(matches!(
            VersionString::parse("   "),
            Err(ReplugError::EmptyVersion)
        ));
        assert!(compare("", "1.0").is_err());
        assert!(compare("1.0", "").is_err());
    }

    #[test]
    fn test_non_numeric_tokens_parse_as_zero() {
        assert_eq!(v("1.x.2"), v("1.0.2"));
        assert_eq!(v("beta"), v("0"));
        assert_eq!(compare("1.beta", "1.0").unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_display_preserves_raw() {
        assert_eq!(v("1.2.0").to_string(), "1.2.0");
        assert_eq!(v(" 1.2 ").to_string(), "1.2");
    }

    #[test]
    fn test_is_newer_than() {
        assert!(v("1.1").is_newer_than(&v("1.0")));
        assert!(!v("1.0").is_newer_than(&v("1.0.0")));
    }
}
