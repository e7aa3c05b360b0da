//! Run report

use serde::Serialize;
use similar::TextDiff;
use std::fmt;
use std::path::PathBuf;

/// What happened to one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// At least one rule rewrote the unit
    Changed {
        /// Rules that produced edits, in run order
        rules: Vec<String>,
        /// Total number of edit spans applied
        edits: usize,
    },
    /// No rule had anything to do
    Unchanged,
    /// Semantic information was unavailable; the unit was left as is
    Skipped {
        /// Why
        reason: String,
    },
    /// A rule refused the unit; the unit was left as is
    Failed {
        /// Why
        reason: String,
    },
}

impl UnitOutcome {
    /// Short label for listings
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Changed { .. } => "changed",
            Self::Unchanged => "unchanged",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }

    /// Check if the unit was rewritten
    #[inline]
    #[must_use]
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Check for a skipped or failed unit
    #[inline]
    #[must_use]
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Skipped { .. } | Self::Failed { .. })
    }
}

/// Report entry for one unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    /// Unit id
    pub unit: String,
    /// File the unit was read from
    pub path: PathBuf,
    /// Outcome
    #[serde(flatten)]
    pub outcome: UnitOutcome,
    /// Unified diff of the rewrite, for changed units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// Result of one run, units in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    /// Per-unit entries, leaf-first
    pub units: Vec<UnitReport>,
    /// Whether writes were suppressed
    pub dry_run: bool,
    /// Files actually written
    pub written: usize,
}

impl Report {
    /// Number of units with the given outcome label
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.units.iter().filter(|u| u.outcome.label() == label).count()
    }

    /// Changed units
    pub fn changed(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.outcome.is_changed())
    }

    /// Skipped and failed units
    pub fn problems(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.outcome.is_problem())
    }

    /// Check that every unit was either rewritten or left alone on purpose
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.problems().next().is_none()
    }

    /// Process exit status for this report
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Every diff, concatenated
    #[must_use]
    pub fn diffs(&self) -> String {
        self.units.iter().filter_map(|u| u.diff.as_deref()).collect()
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    /// Only if serialization itself fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            match &unit.outcome {
                UnitOutcome::Changed { rules, edits } => {
                    writeln!(f, "changed   {} ({edits} edits: {})", unit.unit, rules.join(", "))?;
                }
                UnitOutcome::Unchanged => {}
                UnitOutcome::Skipped { reason } => writeln!(f, "skipped   {}: {reason}", unit.unit)?,
                UnitOutcome::Failed { reason } => writeln!(f, "failed    {}: {reason}", unit.unit)?,
            }
        }
        write!(
            f,
            "{} units: {} changed, {} unchanged, {} skipped, {} failed",
            self.units.len(),
            self.count("changed"),
            self.count("unchanged"),
            self.count("skipped"),
            self.count("failed"),
        )?;
        if self.dry_run {
            f.write_str(" (dry run)")?;
        }
        Ok(())
    }
}

/// Unified diff between two texts of `path`
#[must_use]
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}
