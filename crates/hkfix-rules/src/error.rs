//! Engine errors

use hkfix_source::{EditError, UnitId};

/// Result alias for engine operations
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors raised while querying or rewriting a unit
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The unit has no usable symbol table
    #[error("semantic information unavailable for {unit}: {reason}")]
    SemanticUnavailable {
        /// Unit being queried
        unit: UnitId,
        /// Why resolution failed
        reason: String,
    },

    /// A name matched more than one declaration or target
    #[error("ambiguous match for `{name}` in {unit}: {}", candidates.join(", "))]
    AmbiguousMatch {
        /// Unit being rewritten
        unit: UnitId,
        /// Name that could not be disambiguated
        name: String,
        /// Competing declarations or packages
        candidates: Vec<String>,
    },

    /// A rule produced spans that touch the same text
    #[error("overlapping edits in {unit}: {source}")]
    OverlappingEdits {
        /// Unit being rewritten
        unit: UnitId,
        /// Validation failure
        source: EditError,
    },
}

impl EngineError {
    /// Unit the error belongs to
    #[must_use]
    pub fn unit(&self) -> &UnitId {
        match self {
            Self::SemanticUnavailable { unit, .. }
            | Self::AmbiguousMatch { unit, .. }
            | Self::OverlappingEdits { unit, .. } => unit,
        }
    }

    /// Check if the error must stop the whole run
    ///
    /// Overlapping edits mean a rule is broken, not that one unit is odd.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OverlappingEdits { .. })
    }

    /// Check if the unit was skipped rather than failed
    #[inline]
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SemanticUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display() {
        let err = EngineError::AmbiguousMatch {
            unit: UnitId::new("a/Foo.scala"),
            name: "Foo".into(),
            candidates: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "ambiguous match for `Foo` in a/Foo.scala: a, b");
        assert!(!err.is_fatal());
        assert!(!err.is_skip());
        assert_eq!(err.unit().as_str(), "a/Foo.scala");
    }

    #[test]
    fn engine_error_classification() {
        let skip = EngineError::SemanticUnavailable {
            unit: UnitId::new("x"),
            reason: "parse error".into(),
        };
        assert!(skip.is_skip());
        assert!(!skip.is_fatal());
    }
}
