//! Dotted and bracket-indexed path expressions.
//!
//! `educations[2].name` tokenizes on `.`, `[` and `]` into the segments
//! `educations`, `2`, `name`. Segments are kept as text; whether a segment
//! addresses an integer key is decided by the table it is applied to.

use super::stringify::{detect_number, is_index, NumberType};
use crate::core::error::{DattyError, DattyResult};
use std::str::FromStr;

/// Parsed path into a value tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathExpression {
    segments: Vec<String>,
}

impl PathExpression {
    /// Parse a path. An empty source yields an empty expression.
    pub fn parse(source: &str) -> Self {
        let segments = source
            .split(['.', '[', ']'])
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    /// Parse an optional source; an absent source is a usage error.
    pub fn from_source(source: Option<&str>) -> DattyResult<Self> {
        source
            .map(Self::parse)
            .ok_or_else(|| DattyError::usage("empty path expression source"))
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn size(&self) -> usize {
        self.segments.len()
    }

    /// Segment at `i`.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.segments.get(i).map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Integer index of segment `i`, if it is all digits and fits.
    pub fn index(&self, i: usize) -> Option<i64> {
        self.get(i)
            .filter(|s| is_index(s))
            .and_then(|s| s.parse().ok())
    }

    /// Canonical text: segments that read as a long literal (sign allowed)
    /// are bracketed, names dot-joined.
    pub fn as_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            if detect_number(segment) == NumberType::Long {
                out.push('[');
                out.push_str(segment);
                out.push(']');
            } else {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(segment);
            }
        }
        out
    }
}

impl FromStr for PathExpression {
    type Err = DattyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for PathExpression {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl TryFrom<Option<&str>> for PathExpression {
    type Error = DattyError;

    fn try_from(source: Option<&str>) -> Result<Self, Self::Error> {
        Self::from_source(source)
    }
}

impl std::fmt::Display for PathExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_source() {
        let err = PathExpression::from_source(None).unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_empty() {
        let path = PathExpression::parse("");
        assert!(path.is_empty());
        assert_eq!(path.size(), 0);
        assert!(PathExpression::parse(" . [] ").is_empty());
    }

    #[test]
    fn test_single() {
        let path = PathExpression::parse("logins");
        assert_eq!(path.size(), 1);
        assert_eq!(path.get(0), Some("logins"));
    }

    #[test]
    fn test_single_index() {
        let path = PathExpression::parse("[4]");
        assert_eq!(path.segments(), &["4".to_string()]);
        assert_eq!(path.index(0), Some(4));
    }

    #[test]
    fn test_two_with_index() {
        let path = PathExpression::parse("name[1]");
        assert_eq!(path.size(), 2);
        assert_eq!(path.get(0), Some("name"));
        assert_eq!(path.get(1), Some("1"));
        assert_eq!(path.index(0), None);
    }

    #[test]
    fn test_complex() {
        let path = PathExpression::parse("educations[2].name");
        assert_eq!(path.size(), 3);
        assert_eq!(path.get(0), Some("educations"));
        assert_eq!(path.get(1), Some("2"));
        assert_eq!(path.get(2), Some("name"));
        assert_eq!(path.get(3), None);
    }

    #[test]
    fn test_trims_tokens() {
        let path = PathExpression::parse(" name . first ");
        assert_eq!(path.segments(), &["name".to_string(), "first".to_string()]);
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(
            PathExpression::parse("educations.2.name").as_string(),
            "educations[2].name"
        );
        assert_eq!(PathExpression::parse("[0].a").to_string(), "[0].a");
        assert_eq!(PathExpression::parse("a.b").to_string(), "a.b");
    }

    #[test]
    fn test_signed_segment_is_bracketed() {
        assert_eq!(PathExpression::parse("a.-1").as_string(), "a[-1]");
        assert_eq!(PathExpression::parse("a.+2.b").as_string(), "a[+2].b");
        assert_eq!(PathExpression::parse("a.1.5").as_string(), "a[1][5]");
        assert_eq!(PathExpression::parse("a.-x").as_string(), "a.-x");
    }
}
