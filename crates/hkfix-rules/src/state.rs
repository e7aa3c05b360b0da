//! Per-declaration migration state

use crate::matcher::MatchResult;
use serde::Serialize;
use std::fmt;

/// Shape a service was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceShape {
    /// `trait Foo[Future] extends Marker`
    Legacy,
    /// `trait Foo[F[_]]`
    Modern,
}

/// Where a service is in the add-instances rewrite
///
/// `Unmigrated -> Migrating -> InstancesAttached`. A legacy service is
/// relocated while `Migrating`; a modern one passes straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", content = "shape", rename_all = "snake_case")]
pub enum MigrationState {
    /// Matched, nothing emitted yet
    Unmigrated(ServiceShape),
    /// Relocation (if legacy) in progress
    Migrating(ServiceShape),
    /// Holder carries every binding
    InstancesAttached,
}

impl MigrationState {
    /// Initial state for a service match
    #[must_use]
    pub fn of(matched: &MatchResult) -> Option<Self> {
        match matched {
            MatchResult::LegacyService { .. } => Some(Self::Unmigrated(ServiceShape::Legacy)),
            MatchResult::GeneratedService { .. } => Some(Self::Unmigrated(ServiceShape::Modern)),
            MatchResult::RelocatedReference { .. } => None,
        }
    }

    /// Next state; `InstancesAttached` is terminal
    #[must_use]
    pub fn advance(self) -> Self {
        match self {
            Self::Unmigrated(shape) => Self::Migrating(shape),
            Self::Migrating(_) | Self::InstancesAttached => Self::InstancesAttached,
        }
    }

    /// Shape while not yet attached
    #[inline]
    #[must_use]
    pub fn shape(self) -> Option<ServiceShape> {
        match self {
            Self::Unmigrated(shape) | Self::Migrating(shape) => Some(shape),
            Self::InstancesAttached => None,
        }
    }

    /// Check if the service needs relocating in this state
    #[inline]
    #[must_use]
    pub fn relocates(self) -> bool {
        self == Self::Migrating(ServiceShape::Legacy)
    }

    /// Check for the terminal state
    #[inline]
    #[must_use]
    pub fn is_attached(self) -> bool {
        self == Self::InstancesAttached
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmigrated(shape) => write!(f, "unmigrated ({shape:?})"),
            Self::Migrating(shape) => write!(f, "migrating ({shape:?})"),
            Self::InstancesAttached => f.write_str("instances attached"),
        }
    }
}
