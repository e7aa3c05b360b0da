//! `adapt-references`: qualify references to relocated interfaces
//!
//! `Foo[IO]` becomes `Foo.Foo[IO]` once `Foo` has been relocated into its
//! holder. The rule looks at the applied name only, so running it twice
//! qualifies twice; it is meant to run once per codebase.

use crate::error::Result;
use crate::matcher::{match_relocated_references, MatchResult};
use crate::rule::{validated, RewriteRule};
use hkfix_frontend::CompilationUnit;
use hkfix_source::{EditSet, EditSpan};

/// Rule name
pub const ADAPT_REFERENCES: &str = "adapt-references";

/// Rule B
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptReferences;

impl AdaptReferences {
    /// Create the rule
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RewriteRule for AdaptReferences {
    fn name(&self) -> &'static str {
        ADAPT_REFERENCES
    }

    fn is_idempotent(&self) -> bool {
        false
    }

    fn rewrite(&self, unit: &CompilationUnit) -> Result<EditSet> {
        let mut edits = EditSet::new(ADAPT_REFERENCES, unit.source());
        for matched in match_relocated_references(unit)? {
            let (Some(reference), MatchResult::RelocatedReference { target, .. }) = (matched.reference(unit), &matched)
            else {
                continue;
            };
            edits.push(EditSpan::insert(reference.span.start, format!("{}.", target.name)));
        }
        validated(unit, edits)
    }
}
