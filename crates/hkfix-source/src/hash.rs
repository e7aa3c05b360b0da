//! Content hashing for source texts
//!
//! Provides [`ContentHash`], a strongly-typed 32-byte Blake3 hash used to bind
//! an edit set to the exact text it was computed against.

use std::fmt::{self, Display, Formatter};

/// A 32-byte content hash (Blake3)
///
/// Immutable and cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_compute_deterministic() {
        let h1 = ContentHash::compute(b"trait Foo");
        let h2 = ContentHash::compute(b"trait Foo");
        assert_eq!(h1, h2);
        assert_ne!(h1, ContentHash::compute(b"trait Bar"));
    }

    #[test]
    fn content_hash_serializes_as_hex() {
        let hash = ContentHash::compute(b"object Foo");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        assert_eq!(json.len(), 66);
    }
}
