//! Driver errors
//!
//! Only run-level failures live here. Anything scoped to a single unit is
//! recorded in the [`Report`](crate::Report) instead and never stops the
//! other units.

use hkfix_rules::{EngineError, UnknownRule};
use std::path::PathBuf;

/// Result alias for driver operations
pub type Result<T, E = DriverError> = std::result::Result<T, E>;

/// Errors that stop a whole run
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Reading or writing a file failed
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Walking a source root failed
    #[error("discovery failed: {0}")]
    Walk(#[from] ignore::Error),

    /// Configuration could not be read or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// A rule name is not registered
    #[error("configuration error: {0}")]
    UnknownRule(#[from] UnknownRule),

    /// Packages import each other
    #[error("dependency cycle between units: {}", units.join(", "))]
    DependencyCycle {
        /// Units on the cycle, sorted
        units: Vec<String>,
    },

    /// A rule produced invalid edits; nothing was written
    #[error("run aborted: {0}")]
    Aborted(#[from] EngineError),
}

impl DriverError {
    /// I/O error with path context
    #[inline]
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::UnknownRule(_) => 2,
            _ => 1,
        }
    }
}

impl From<toml::de::Error> for DriverError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_cycle() {
        let err = DriverError::DependencyCycle {
            units: vec!["a/A.scala".into(), "b/B.scala".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle between units: a/A.scala, b/B.scala");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn error_io_carries_path() {
        let err = DriverError::io("x/Y.scala", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("i/o error on x/Y.scala"));
    }

    #[test]
    fn error_config_exit_code() {
        let err: DriverError = toml::from_str::<toml::Table>("= broken").unwrap_err().into();
        assert!(matches!(err, DriverError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
