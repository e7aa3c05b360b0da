//! Textual edits over a source text
//!
//! Provides [`EditSpan`] (one replacement over a byte range) and [`EditSet`]
//! (all spans one rule produced for one unit, bound to the text they were
//! computed against). An edit set is applied atomically: either every span
//! lands or the source is left untouched.

use crate::hash::ContentHash;
use crate::source::SourceText;
use std::fmt::{self, Display, Formatter};

/// Replacement of `start..end` with `replacement`
///
/// Insertions are zero-width spans (`start == end`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct EditSpan {
    start: usize,
    end: usize,
    replacement: String,
}

impl EditSpan {
    /// Replace a byte range
    ///
    /// # Panics
    /// Panics if `start > end`; spans are built by the rules from parsed
    /// offsets, so an inverted range is a programming error.
    #[inline]
    #[must_use]
    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        assert!(start <= end, "inverted edit span {start}..{end}");
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    /// Insert text at an offset
    #[inline]
    #[must_use]
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    /// Start offset (inclusive)
    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// End offset (exclusive)
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Replacement text
    #[inline]
    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Check if this span is a pure insertion
    #[inline]
    #[must_use]
    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    /// Check if two spans touch the same text
    ///
    /// Ranges overlap when they intersect. Two insertions at the same offset
    /// overlap too, since their relative order would be arbitrary. An
    /// insertion on the boundary of a replaced range does not overlap it.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.is_insertion() && other.is_insertion() {
            return self.start == other.start;
        }
        if self.is_insertion() {
            return other.start < self.start && self.start < other.end;
        }
        if other.is_insertion() {
            return self.start < other.start && other.start < self.end;
        }
        self.start < other.end && other.start < self.end
    }
}

impl Display for EditSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} => {:?}", self.start, self.end, self.replacement)
    }
}

/// Every span one rule produced for one unit
///
/// # Invariants
/// - `base_hash` is the hash of the text the spans were computed against
/// - spans never overlap (checked by [`EditSet::validate`] and again on apply)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EditSet {
    rule: &'static str,
    base_hash: ContentHash,
    spans: Vec<EditSpan>,
}

impl EditSet {
    /// Create an empty edit set for a source text
    #[inline]
    #[must_use]
    pub fn new(rule: &'static str, base: &SourceText) -> Self {
        Self {
            rule,
            base_hash: *base.hash(),
            spans: Vec::new(),
        }
    }

    /// Add a span
    #[inline]
    pub fn push(&mut self, span: EditSpan) {
        self.spans.push(span);
    }

    /// Rule that produced the set
    #[inline]
    #[must_use]
    pub fn rule(&self) -> &'static str {
        self.rule
    }

    /// Hash of the text this set applies to
    #[inline]
    #[must_use]
    pub fn base_hash(&self) -> &ContentHash {
        &self.base_hash
    }

    /// Spans in insertion order
    #[inline]
    #[must_use]
    pub fn spans(&self) -> &[EditSpan] {
        &self.spans
    }

    /// Number of spans
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Check if set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Verify no two spans overlap
    ///
    /// # Errors
    /// Returns [`EditError::Overlapping`] naming the first conflicting pair
    ///
    /// # Performance
    /// O(n log n): sorts by start offset and compares neighbours.
    pub fn validate(&self) -> Result<(), EditError> {
        let mut ordered: Vec<&EditSpan> = self.spans.iter().collect();
        ordered.sort_by_key(|s| (s.start, s.end));

        for pair in ordered.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.overlaps(b) {
                return Err(EditError::Overlapping {
                    first: a.clone(),
                    second: b.clone(),
                });
            }
        }

        // A zero-width span can sit inside a wider one that is not its
        // immediate neighbour, e.g. [0,10) [3,3) [3,5).
        let mut widest_end = 0usize;
        let mut widest: Option<&EditSpan> = None;
        for span in &ordered {
            if let Some(w) = widest {
                if span.start < widest_end && w.overlaps(span) {
                    return Err(EditError::Overlapping {
                        first: w.clone(),
                        second: (*span).clone(),
                    });
                }
            }
            if span.end > widest_end {
                widest_end = span.end;
                widest = Some(span);
            }
        }

        Ok(())
    }

    /// Apply all spans to `base`, producing a new source text
    ///
    /// Spans are applied from the highest offset down so that earlier
    /// offsets stay valid. On equal start offsets the wider span is applied
    /// first, which keeps an insertion in front of a replacement starting at
    /// the same offset.
    ///
    /// # Errors
    /// - `BaseMismatch` if `base` is not the text the set was computed against
    /// - `Overlapping` if two spans intersect
    /// - `OutOfBounds` / `NotCharBoundary` for spans outside the text
    pub fn apply(&self, base: &SourceText) -> Result<SourceText, EditError> {
        if self.base_hash != *base.hash() {
            return Err(EditError::BaseMismatch {
                expected: self.base_hash,
                actual: *base.hash(),
            });
        }
        if self.spans.is_empty() {
            return Ok(base.clone());
        }
        self.validate()?;

        let text = base.as_str();
        for span in &self.spans {
            if span.end > text.len() {
                return Err(EditError::OutOfBounds {
                    span: span.clone(),
                    len: text.len(),
                });
            }
            if !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
                return Err(EditError::NotCharBoundary { span: span.clone() });
            }
        }

        let mut ordered: Vec<&EditSpan> = self.spans.iter().collect();
        ordered.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));

        let mut out = text.to_string();
        for span in ordered {
            out.replace_range(span.start..span.end, &span.replacement);
        }
        Ok(SourceText::new(out))
    }
}

/// Errors raised while validating or applying edits
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// Two spans of one set intersect
    #[error("overlapping edits: {first} and {second}")]
    Overlapping { first: EditSpan, second: EditSpan },

    /// Span reaches past the end of the text
    #[error("edit {span} out of bounds for text of {len} bytes")]
    OutOfBounds { span: EditSpan, len: usize },

    /// Span boundary splits a UTF-8 character
    #[error("edit {span} does not fall on a char boundary")]
    NotCharBoundary { span: EditSpan },

    /// Edit set was computed against a different text
    #[error("base hash mismatch: expected {expected}, got {actual}")]
    BaseMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn span_overlap_rules() {
        let replace = EditSpan::replace(2, 6, "x");
        assert!(replace.overlaps(&EditSpan::replace(5, 8, "y")));
        assert!(!replace.overlaps(&EditSpan::replace(6, 8, "y")));
        assert!(replace.overlaps(&EditSpan::insert(4, "i")));
        assert!(!replace.overlaps(&EditSpan::insert(2, "i")));
        assert!(!replace.overlaps(&EditSpan::insert(6, "i")));
        assert!(EditSpan::insert(3, "a").overlaps(&EditSpan::insert(3, "b")));
        assert!(!EditSpan::insert(3, "a").overlaps(&EditSpan::insert(4, "b")));
    }

    #[test]
    fn apply_highest_offset_first() {
        let base = SourceText::new("val x: Foo[IO] = y");
        let mut set = EditSet::new("test", &base);
        set.push(EditSpan::insert(7, "Foo."));
        set.push(EditSpan::replace(17, 18, "z"));
        let out = set.apply(&base).unwrap();
        assert_eq!(out.as_str(), "val x: Foo.Foo[IO] = z");
    }

    #[test]
    fn apply_insertion_before_replacement_at_same_offset() {
        let base = SourceText::new("abc");
        let mut set = EditSet::new("test", &base);
        set.push(EditSpan::replace(0, 1, "X"));
        set.push(EditSpan::insert(0, ">"));
        assert_eq!(set.apply(&base).unwrap().as_str(), ">Xbc");
    }

    #[test]
    fn apply_rejects_overlap_without_touching_source() {
        let base = SourceText::new("abcdef");
        let mut set = EditSet::new("test", &base);
        set.push(EditSpan::replace(0, 3, "X"));
        set.push(EditSpan::replace(2, 4, "Y"));
        let err = set.apply(&base).unwrap_err();
        assert!(matches!(err, EditError::Overlapping { .. }));
        assert_eq!(base.as_str(), "abcdef");
    }

    #[test]
    fn validate_finds_insertion_inside_non_neighbour() {
        let base = SourceText::new("0123456789");
        let mut set = EditSet::new("test", &base);
        set.push(EditSpan::replace(0, 10, "X"));
        set.push(EditSpan::insert(3, "i"));
        set.push(EditSpan::replace(3, 5, "Y"));
        assert!(matches!(set.validate(), Err(EditError::Overlapping { .. })));
    }

    #[test]
    fn apply_checks_base_hash() {
        let base = SourceText::new("trait Foo");
        let other = SourceText::new("trait Bar");
        let mut set = EditSet::new("test", &base);
        set.push(EditSpan::insert(0, "x"));
        assert!(matches!(
            set.apply(&other),
            Err(EditError::BaseMismatch { .. })
        ));
    }

    #[test]
    fn apply_rejects_out_of_bounds() {
        let base = SourceText::new("abc");
        let mut set = EditSet::new("test", &base);
        set.push(EditSpan::insert(10, "x"));
        assert!(matches!(
            set.apply(&base),
            Err(EditError::OutOfBounds { len: 3, .. })
        ));
    }

    #[test]
    fn empty_set_is_identity() {
        let base = SourceText::new("object Foo");
        let set = EditSet::new("test", &base);
        assert!(set.is_empty());
        assert_eq!(set.apply(&base).unwrap(), base);
    }
}
