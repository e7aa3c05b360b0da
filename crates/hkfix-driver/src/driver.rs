//! Leaf-first migration pipeline
//!
//! A run has four phases:
//!
//! 1. **Read**: every discovered file is read concurrently through the
//!    [`Storage`].
//! 2. **Order**: headers (package, imports and top-level names) are parsed
//!    in parallel and the dependency graph is sorted leaf-first.
//! 3. **Rewrite**: units are processed one at a time in that order. Each
//!    unit is resolved against the [`ProgramIndex`], every selected rule runs
//!    on the output of the previous one, and the final unit is registered so
//!    that dependents resolve against the migrated code.
//! 4. **Persist**: changed units are written, only once every unit has been
//!    computed. A fatal rule error in phase 3 means nothing is written.

use crate::config::HkfixConfig;
use crate::discovery::discover_sources;
use crate::error::{DriverError, Result};
use crate::graph::DependencyGraph;
use crate::report::{unified_diff, Report, UnitOutcome, UnitReport};
use crate::storage::{FsStorage, Storage};
use futures::stream::{self, StreamExt, TryStreamExt};
use hkfix_frontend::{exported_symbols, CompilationUnit, FrontEnd, ScalaFrontEnd, UnitHeader};
use hkfix_rules::{EngineError, RewriteRule, RuleRegistry};
use hkfix_source::{SourceText, UnitId};
use hkfix_symbol::ProgramIndex;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One file as read from storage
#[derive(Debug)]
struct LoadedFile {
    id: UnitId,
    path: PathBuf,
    /// `Err` holds the reason the file is not processed
    source: std::result::Result<SourceText, String>,
}

/// Rewrite result of one unit, before persistence
struct Processed {
    outcome: UnitOutcome,
    rewritten: Option<SourceText>,
}

/// Migration driver
///
/// Holds everything a run needs; runs themselves share no state, each one
/// builds a fresh [`ProgramIndex`].
pub struct Driver {
    config: HkfixConfig,
    frontend: Arc<dyn FrontEnd>,
    storage: Arc<dyn Storage>,
    rules: Vec<Arc<dyn RewriteRule>>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("rules", &self.rule_names())
            .finish_non_exhaustive()
    }
}

impl Driver {
    /// Create a driver over the filesystem with the Scala front-end
    ///
    /// # Errors
    /// Returns [`DriverError::UnknownRule`] if the configuration selects a
    /// rule that is not registered
    pub fn new(config: HkfixConfig) -> Result<Self> {
        let registry = RuleRegistry::with_defaults(&config.engine);
        Self::with_registry(config, &registry)
    }

    /// Create a driver selecting rules from a custom registry
    ///
    /// # Errors
    /// Returns [`DriverError::UnknownRule`] for an unregistered selection
    pub fn with_registry(config: HkfixConfig, registry: &RuleRegistry) -> Result<Self> {
        let rules = registry.select(&config.driver.rules)?;
        Ok(Self {
            config,
            frontend: Arc::new(ScalaFrontEnd::new()),
            storage: Arc::new(FsStorage::new()),
            rules,
        })
    }

    /// With storage backend
    #[inline]
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// With front-end
    #[inline]
    #[must_use]
    pub fn with_frontend(mut self, frontend: Arc<dyn FrontEnd>) -> Self {
        self.frontend = frontend;
        self
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HkfixConfig {
        &self.config
    }

    /// Selected rules, in run order
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Source files under `roots`
    ///
    /// # Errors
    /// Returns [`DriverError::Walk`] if a root cannot be walked
    pub async fn discover(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let roots = roots.to_vec();
        let config = self.config.driver.clone();
        tokio::task::spawn_blocking(move || discover_sources(&roots, &config))
            .await
            .map_err(|e| DriverError::io(PathBuf::new(), std::io::Error::other(e)))?
    }

    /// Files under `roots` in the order a run would process them
    ///
    /// # Errors
    /// Discovery, read and dependency-cycle errors
    pub async fn order(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let paths = self.discover(roots).await?;
        let files = self.read_all(paths).await?;
        let order = self.leaf_first(&files)?;
        Ok(order.into_iter().map(|i| files[i].path.clone()).collect())
    }

    /// Discover, rewrite and persist everything under `roots`
    ///
    /// # Errors
    /// Only run-level failures; per-unit problems are in the report
    pub async fn run(&self, roots: &[PathBuf]) -> Result<Report> {
        let paths = self.discover(roots).await?;
        self.run_files(paths).await
    }

    /// Rewrite and persist exactly `paths`
    ///
    /// # Errors
    /// - `Io` when a file cannot be read or written
    /// - `DependencyCycle` when packages import each other
    /// - `Aborted` when a rule produced overlapping edits; nothing is written
    pub async fn run_files(&self, paths: Vec<PathBuf>) -> Result<Report> {
        let files = self.read_all(paths).await?;
        let order = self.leaf_first(&files)?;
        info!(
            units = files.len(),
            rules = ?self.rule_names(),
            dry_run = self.config.driver.dry_run,
            "starting run"
        );

        let index = ProgramIndex::new();
        let mut results = Vec::with_capacity(order.len());
        for i in order {
            let file = &files[i];
            let processed = self.process(&index, file)?;
            results.push((file, processed));
        }

        let mut report = Report {
            dry_run: self.config.driver.dry_run,
            ..Report::default()
        };
        let mut pending = Vec::new();
        for (file, processed) in results {
            let diff = match (&processed.rewritten, &file.source) {
                (Some(new), Ok(old)) => {
                    pending.push((file.path.clone(), new.clone()));
                    Some(unified_diff(file.id.as_str(), old.as_str(), new.as_str()))
                }
                _ => None,
            };
            report.units.push(UnitReport {
                unit: file.id.to_string(),
                path: file.path.clone(),
                outcome: processed.outcome,
                diff,
            });
        }

        if !report.dry_run {
            report.written = self.persist(pending).await?;
        }

        info!(
            changed = report.count("changed"),
            skipped = report.count("skipped"),
            failed = report.count("failed"),
            written = report.written,
            "run finished"
        );
        Ok(report)
    }

    async fn read_all(&self, paths: Vec<PathBuf>) -> Result<Vec<LoadedFile>> {
        let max = self.config.driver.max_file_size;
        stream::iter(paths)
            .map(|path| async move {
                let text = self.storage.read(&path).await?;
                let id = UnitId::new(path.to_string_lossy());
                let source = if text.len() > max {
                    Err(format!("file too large: {} bytes (max: {max})", text.len()))
                } else {
                    Ok(SourceText::new(text))
                };
                Ok::<_, DriverError>(LoadedFile { id, path, source })
            })
            .buffered(self.config.driver.read_concurrency.max(1))
            .try_collect()
            .await
    }

    fn leaf_first(&self, files: &[LoadedFile]) -> Result<Vec<usize>> {
        let headers: Vec<(UnitId, UnitHeader)> = files
            .par_iter()
            .map(|file| {
                let header = match &file.source {
                    Ok(source) => self.frontend.header(source),
                    Err(_) => UnitHeader::default(),
                };
                (file.id.clone(), header)
            })
            .collect();

        let graph = DependencyGraph::build(&headers);
        debug!(units = graph.len(), edges = graph.edge_count(), "built dependency graph");
        graph.leaf_first()
    }

    /// Run every rule on one unit and register the result
    fn process(&self, index: &ProgramIndex, file: &LoadedFile) -> Result<Processed> {
        let source = match &file.source {
            Ok(source) => source.clone(),
            Err(reason) => {
                warn!(unit = %file.id, %reason, "unit skipped");
                return Ok(Processed {
                    outcome: UnitOutcome::Skipped {
                        reason: reason.clone(),
                    },
                    rewritten: None,
                });
            }
        };

        let original = self.load(file, source.clone(), index);
        let mut unit = original.clone();
        let mut applied = Vec::new();
        let mut edits = 0;

        for rule in &self.rules {
            let set = match rule.rewrite(&unit) {
                Ok(set) => set,
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    let outcome = if err.is_skip() {
                        UnitOutcome::Skipped {
                            reason: err.to_string(),
                        }
                    } else {
                        UnitOutcome::Failed {
                            reason: err.to_string(),
                        }
                    };
                    warn!(unit = %file.id, rule = rule.name(), error = %err, "unit {}", outcome.label());
                    if let Err(reason) = Self::register(index, &original) {
                        warn!(unit = %file.id, %reason, "original declarations not registered");
                    }
                    return Ok(Processed {
                        outcome,
                        rewritten: None,
                    });
                }
            };
            if set.is_empty() {
                continue;
            }

            debug!(unit = %file.id, rule = rule.name(), spans = set.len(), "applying edits");
            let text = set.apply(unit.source()).map_err(|source| EngineError::OverlappingEdits {
                unit: file.id.clone(),
                source,
            })?;
            edits += set.len();
            applied.push(rule.name().to_string());
            unit = self.load(file, text, index);
        }

        if let Err(reason) = Self::register(index, &unit) {
            warn!(unit = %file.id, %reason, "unit failed");
            return Ok(Processed {
                outcome: UnitOutcome::Failed { reason },
                rewritten: None,
            });
        }

        if unit.source().hash() == source.hash() {
            debug!(unit = %file.id, "unit unchanged");
            return Ok(Processed {
                outcome: UnitOutcome::Unchanged,
                rewritten: None,
            });
        }

        info!(unit = %file.id, rules = ?applied, edits, "unit changed");
        Ok(Processed {
            outcome: UnitOutcome::Changed {
                rules: applied,
                edits,
            },
            rewritten: Some(unit.source().clone()),
        })
    }

    fn load(&self, file: &LoadedFile, source: SourceText, index: &ProgramIndex) -> CompilationUnit {
        self.frontend
            .load(file.id.clone(), file.path.clone(), source, index)
    }

    /// Replace the unit's symbols in the index
    fn register(index: &ProgramIndex, unit: &CompilationUnit) -> std::result::Result<(), String> {
        index
            .register_unit(unit.id(), unit.package_name(), exported_symbols(unit))
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn persist(&self, pending: Vec<(PathBuf, SourceText)>) -> Result<usize> {
        let mut written = 0;
        for (path, text) in pending {
            self.storage.write(&path, text.as_str()).await?;
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use hkfix_test_utils::{LEGACY_SERVICE, ORDINARY_TRAIT};

    fn memory(files: &[(&str, &str)]) -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        for (path, text) in files {
            storage.insert(*path, *text);
        }
        storage
    }

    fn paths(files: &[(&str, &str)]) -> Vec<PathBuf> {
        files.iter().map(|(p, _)| PathBuf::from(p)).collect()
    }

    #[test]
    fn driver_rejects_unknown_rule() {
        let config = HkfixConfig::new().with_rules(["add-instances", "rename-everything"]);
        let err = Driver::new(config).unwrap_err();
        assert!(matches!(err, DriverError::UnknownRule(_)));
    }

    #[tokio::test]
    async fn driver_rewrites_and_persists() {
        let files = [("api/Greeter.scala", LEGACY_SERVICE), ("util/Clock.scala", ORDINARY_TRAIT)];
        let storage = memory(&files);
        let driver = Driver::new(HkfixConfig::new()).unwrap().with_storage(storage.clone());

        let report = driver.run_files(paths(&files)).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.count("changed"), 1);
        assert_eq!(report.written, 1);
        assert_eq!(storage.write_count(), 1);

        let text = storage.get(std::path::Path::new("api/Greeter.scala")).unwrap();
        assert!(text.contains("trait Greeter extends Greeter.Greeter[Future]"));
        assert!(text.contains("implicit val GreeterFunctorK"));
        assert_eq!(storage.get(std::path::Path::new("util/Clock.scala")).unwrap(), ORDINARY_TRAIT);
    }

    #[tokio::test]
    async fn driver_dry_run_writes_nothing() {
        let files = [("api/Greeter.scala", LEGACY_SERVICE)];
        let storage = memory(&files);
        let driver = Driver::new(HkfixConfig::new().with_dry_run(true))
            .unwrap()
            .with_storage(storage.clone());

        let report = driver.run_files(paths(&files)).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.count("changed"), 1);
        assert_eq!(report.written, 0);
        assert_eq!(storage.write_count(), 0);
        assert!(report.diffs().contains("+object Greeter {"));
    }

    #[tokio::test]
    async fn driver_skips_oversized_files() {
        let files = [("api/Greeter.scala", LEGACY_SERVICE)];
        let storage = memory(&files);
        let mut config = HkfixConfig::new();
        config.driver.max_file_size = 16;
        let driver = Driver::new(config).unwrap().with_storage(storage.clone());

        let report = driver.run_files(paths(&files)).await.unwrap();
        assert_eq!(report.count("skipped"), 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn driver_missing_file_is_io_error() {
        let driver = Driver::new(HkfixConfig::new())
            .unwrap()
            .with_storage(Arc::new(MemoryStorage::new()));
        let err = driver.run_files(vec![PathBuf::from("nope.scala")]).await.unwrap_err();
        assert!(matches!(err, DriverError::Io { .. }));
    }
}
