//! Run configuration (`hkfix.toml`)

use crate::error::{DriverError, Result};
use hkfix_rules::{EngineConfig, ADAPT_REFERENCES, ADD_INSTANCES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "hkfix.toml";

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HkfixConfig {
    /// Matcher and template names
    pub engine: EngineConfig,
    /// Discovery and pipeline settings
    pub driver: DriverConfig,
}

impl HkfixConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns [`DriverError::Config`] on malformed TOML or unknown keys
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read configuration from `path`
    ///
    /// # Errors
    /// Returns [`DriverError::Io`] if the file cannot be read, or
    /// [`DriverError::Config`] if it does not parse
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DriverError::io(path, e))?;
        Self::from_toml(&text).map_err(|e| match e {
            DriverError::Config(msg) => DriverError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Read `path` if given, else `hkfix.toml` if it exists, else defaults
    ///
    /// # Errors
    /// Same as [`HkfixConfig::load`]
    pub async fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path).await;
        }
        let default = Path::new(CONFIG_FILE);
        if tokio::fs::try_exists(default).await.unwrap_or(false) {
            Self::load(default).await
        } else {
            Ok(Self::default())
        }
    }

    /// With engine configuration
    #[inline]
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// With rule selection (empty keeps the configured rules)
    #[must_use]
    pub fn with_rules<S: Into<String>>(mut self, rules: impl IntoIterator<Item = S>) -> Self {
        let rules: Vec<String> = rules.into_iter().map(Into::into).collect();
        if !rules.is_empty() {
            self.driver.rules = rules;
        }
        self
    }

    /// With dry-run flag
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.driver.dry_run = dry_run;
        self
    }
}

/// Settings of the driver itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// File extensions considered source units (without dot)
    pub extensions: Vec<String>,
    /// Rules to run, in registry order
    pub rules: Vec<String>,
    /// Files larger than this are skipped (bytes)
    pub max_file_size: usize,
    /// Number of files read concurrently
    pub read_concurrency: usize,
    /// Compute everything, write nothing
    pub dry_run: bool,
}

impl DriverConfig {
    /// Check if `path` has one of the configured extensions
    #[must_use]
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x == ext))
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["scala".into()],
            rules: vec![ADD_INSTANCES.into(), ADAPT_REFERENCES.into()],
            max_file_size: 10 * 1024 * 1024, // 10MB
            read_concurrency: 32,
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_defaults() {
        let config = HkfixConfig::new();
        assert_eq!(config.driver.extensions, vec!["scala"]);
        assert_eq!(config.driver.rules, vec!["add-instances", "adapt-references"]);
        assert_eq!(config.driver.max_file_size, 10 * 1024 * 1024);
        assert!(!config.driver.dry_run);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn config_partial_file() {
        let config = HkfixConfig::from_toml(
            r#"
            [engine]
            async_type = "Task"

            [engine.imports]
            functor_k = "my.tagless.FunctorK"

            [driver]
            extensions = ["scala", "sc"]
            rules = ["add-instances"]
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.async_type, "Task");
        assert_eq!(config.engine.marker_interface, "ThriftService");
        assert_eq!(config.engine.imports.functor_k_name(), "FunctorK");
        assert_eq!(config.driver.rules, vec!["add-instances"]);
        assert!(config.driver.is_source(Path::new("x/Y.sc")));
        assert!(!config.driver.is_source(Path::new("x/Y.java")));
        assert_eq!(config.driver.max_file_size, 10 * 1024 * 1024);
    }

    #[test]
    fn config_rejects_unknown_keys() {
        let err = HkfixConfig::from_toml("[driver]\nthreads = 4\n").unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[test]
    fn config_cli_overrides() {
        let config = HkfixConfig::new()
            .with_rules(Vec::<String>::new())
            .with_dry_run(true);
        assert_eq!(config.driver.rules.len(), 2);
        assert!(config.driver.dry_run);

        let config = config.with_rules(["adapt-references"]);
        assert_eq!(config.driver.rules, vec!["adapt-references"]);
    }

    #[tokio::test]
    async fn config_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        tokio::fs::write(&path, "[engine]\nmarker_interface = 3\n").await.unwrap();
        let err = HkfixConfig::load(&path).await.unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE));

        tokio::fs::write(&path, "[engine]\nmarker_interface = \"AsyncService\"\n").await.unwrap();
        let config = HkfixConfig::discover(Some(&path)).await.unwrap();
        assert_eq!(config.engine.marker_interface, "AsyncService");
    }
}
