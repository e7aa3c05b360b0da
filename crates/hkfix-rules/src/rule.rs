//! Rewrite rule trait

use crate::error::{EngineError, Result};
use hkfix_frontend::CompilationUnit;
use hkfix_source::EditSet;
use std::fmt::Debug;

/// A rewrite over one compilation unit
///
/// Rules only compute edits: no I/O, no logging, no mutation of the unit.
/// The driver applies the returned set and reloads the unit before the next
/// rule runs.
pub trait RewriteRule: Send + Sync + Debug {
    /// Rule name (for selection and reports)
    fn name(&self) -> &'static str;

    /// Check if running the rule on its own output is a no-op
    fn is_idempotent(&self) -> bool;

    /// Compute the edits for `unit`
    ///
    /// # Errors
    /// - [`EngineError::SemanticUnavailable`] when the unit is unresolved
    /// - [`EngineError::AmbiguousMatch`] when a match cannot be decided
    /// - [`EngineError::OverlappingEdits`] when the computed spans collide
    fn rewrite(&self, unit: &CompilationUnit) -> Result<EditSet>;
}

/// Check an edit set before handing it out
pub(crate) fn validated(unit: &CompilationUnit, edits: EditSet) -> Result<EditSet> {
    edits
        .validate()
        .map_err(|source| EngineError::OverlappingEdits {
            unit: unit.id().clone(),
            source,
        })?;
    Ok(edits)
}
