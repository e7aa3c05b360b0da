//! Dotted names for packages and declarations
//!
//! Provides [`QualifiedName`] for addressing packages (`com.example.api`) and
//! the declarations inside them (`com.example.api.Greeter`).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Fully qualified dotted name
///
/// # Examples
/// - `["com", "example"]` → `com.example`
/// - `["cats", "~>"]` → `cats.~>`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName(Vec<String>);

impl QualifiedName {
    /// Create new name from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Empty name (the root package)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get name segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if name is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get enclosing name (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a segment, returning new name
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Check if this name is a prefix of another
    ///
    /// `com.example` is a prefix of `com.example.Foo` but not of `com.examples`.
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Join segments with custom separator
    #[inline]
    #[must_use]
    pub fn join(&self, separator: &str) -> String {
        self.0.join(separator)
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for QualifiedName {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = s
            .split('.')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else if seg.contains(char::is_whitespace) {
                    Err(PathError::InvalidSegment(seg.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl From<Vec<String>> for QualifiedName {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl Default for QualifiedName {
    fn default() -> Self {
        Self::root()
    }
}

impl serde::Serialize for QualifiedName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for QualifiedName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors related to qualified names
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Empty segment in name
    #[error("name contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0:?}")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_parent_and_last() {
        let name = QualifiedName::from_str("com.example.Foo").unwrap();
        assert_eq!(name.parent().unwrap().to_string(), "com.example");
        assert_eq!(name.last(), Some("Foo"));
        assert!(QualifiedName::root().parent().is_none());
    }

    #[test]
    fn name_is_prefix_of_respects_segments() {
        let a = QualifiedName::from_str("com.example").unwrap();
        let b = QualifiedName::from_str("com.example.Foo").unwrap();
        let c = QualifiedName::from_str("com.examples.Foo").unwrap();
        assert!(a.is_prefix_of(&b));
        assert!(!a.is_prefix_of(&c));
    }

    #[test]
    fn name_accepts_operator_segments() {
        let name: QualifiedName = "cats.~>".parse().unwrap();
        assert_eq!(name.last(), Some("~>"));
    }

    #[test]
    fn name_from_str_empty_segment() {
        let result: Result<QualifiedName, _> = "a..b".parse();
        assert!(matches!(result, Err(PathError::EmptySegment)));
    }

    #[test]
    fn name_from_str_empty_is_root() {
        let name: QualifiedName = "".parse().unwrap();
        assert!(name.is_empty());
    }

    #[test]
    fn name_join() {
        let name = QualifiedName::new(vec!["a".into(), "b".into()]);
        assert_eq!(name.join("/"), "a/b");
        assert_eq!(name.child("C").to_string(), "a.b.C");
    }
}
