//! Source discovery
//!
//! Walks the given roots with `ignore`, so `.gitignore` and hidden-file
//! rules apply the way they do for the build tool.

use crate::config::DriverConfig;
use crate::error::Result;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every source file under `roots`, sorted and deduplicated
///
/// A root that is itself a file is returned if its extension matches.
///
/// # Errors
/// Returns [`DriverError::Walk`](crate::DriverError::Walk) when a root does
/// not exist or a directory cannot be read
pub fn discover_sources(roots: &[PathBuf], config: &DriverConfig) -> Result<Vec<PathBuf>> {
    let Some((first, rest)) = roots.split_first() else {
        return Ok(Vec::new());
    };

    let mut builder = WalkBuilder::new(first);
    for root in rest {
        builder.add(root);
    }
    builder
        .follow_links(false)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != ".git");

    let mut found = BTreeSet::new();
    for entry in builder.build() {
        let entry = entry?;
        let is_file = entry.file_type().is_some_and(|t| t.is_file());
        if is_file && config.is_source(entry.path()) {
            found.insert(normalize(entry.path()));
        }
    }

    debug!(roots = roots.len(), files = found.len(), "discovered sources");
    Ok(found.into_iter().collect())
}

/// Strip a leading `./` so unit ids read the same however the root was given
fn normalize(path: &Path) -> PathBuf {
    path.strip_prefix(".").map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "package x\n").unwrap();
    }

    #[test]
    fn discover_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/A.scala");
        touch(dir.path(), "a/B.java");
        touch(dir.path(), "b/c/C.scala");

        let found = discover_sources(&[dir.path().to_path_buf()], &DriverConfig::default()).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, vec!["A.scala", "C.scala"]);
    }

    #[test]
    fn discover_respects_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
        touch(dir.path(), "src/A.scala");
        touch(dir.path(), "target/Gen.scala");

        let found = discover_sources(&[dir.path().to_path_buf()], &DriverConfig::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("src/A.scala"));
    }

    #[test]
    fn discover_file_roots_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "A.scala");
        let file = dir.path().join("A.scala");

        let found = discover_sources(&[file.clone(), dir.path().to_path_buf()], &DriverConfig::default()).unwrap();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn discover_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(discover_sources(&[missing], &DriverConfig::default()).is_err());
    }
}
