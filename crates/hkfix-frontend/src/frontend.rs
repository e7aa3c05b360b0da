//! Front-end entry points
//!
//! A [`FrontEnd`] turns source text into [`CompilationUnit`]s resolved
//! against the current program index. [`ScalaFrontEnd`] is the only
//! implementation; the trait is the seam the driver is written against.

use crate::ast::{Declaration, Import, PackageClause};
use crate::error::ParseError;
use crate::parser::{parse, parse_header};
use crate::resolve::resolve;
use crate::unit::CompilationUnit;
use hkfix_source::{QualifiedName, SourceText, UnitId};
use hkfix_symbol::ProgramIndex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Package, imports and top-level names of a unit, read without resolving
/// anything
#[derive(Debug, Clone, Default)]
pub struct UnitHeader {
    pub package: Option<PackageClause>,
    pub imports: Vec<Import>,
    /// Names of top-level declarations
    pub declared: BTreeSet<String>,
    /// Names applied in type position
    pub referenced: BTreeSet<String>,
    /// Set when even the header could not be read
    pub error: Option<ParseError>,
}

impl UnitHeader {
    /// Package name (root when there is no clause)
    #[must_use]
    pub fn package_name(&self) -> QualifiedName {
        self.package
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// Every name the imports refer to
    #[must_use]
    pub fn import_targets(&self) -> Vec<QualifiedName> {
        self.imports.iter().flat_map(Import::targets).collect()
    }
}

/// Compiler front-end collaborator
///
/// Implement this trait to support another source language.
pub trait FrontEnd: Send + Sync + 'static {
    /// Supported file extensions (without dot)
    fn extensions(&self) -> &[&str];

    /// Check if this front-end can handle the given path
    fn can_load(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }

    /// Read package, imports and top-level names only
    fn header(&self, source: &SourceText) -> UnitHeader;

    /// Parse and resolve a unit against `index`
    ///
    /// Never fails: a unit that cannot be parsed or resolved comes back with
    /// an unresolved symbol table, and every query on it fails.
    fn load(&self, id: UnitId, path: PathBuf, source: SourceText, index: &ProgramIndex) -> CompilationUnit;
}

/// Front-end for Scala sources
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalaFrontEnd;

impl ScalaFrontEnd {
    /// Create the front-end
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FrontEnd for ScalaFrontEnd {
    fn extensions(&self) -> &[&str] {
        &["scala", "sc"]
    }

    fn header(&self, source: &SourceText) -> UnitHeader {
        if let Ok(parsed) = parse(source.as_str()) {
            return UnitHeader {
                declared: parsed.decls.iter().filter_map(Declaration::name).map(str::to_string).collect(),
                referenced: parsed.type_refs.iter().map(|r| r.name.clone()).collect(),
                package: parsed.package,
                imports: parsed.imports,
                error: None,
            };
        }
        // A unit that does not parse still gets its place in the graph
        match parse_header(source.as_str()) {
            Ok((package, imports)) => UnitHeader {
                package,
                imports,
                ..UnitHeader::default()
            },
            Err(error) => UnitHeader {
                error: Some(error),
                ..UnitHeader::default()
            },
        }
    }

    fn load(&self, id: UnitId, path: PathBuf, source: SourceText, index: &ProgramIndex) -> CompilationUnit {
        let parsed = match parse(source.as_str()) {
            Ok(parsed) => parsed,
            Err(error) => {
                warn!(unit = %id, %error, "parse failed");
                let reason = format!("parse error at {error}");
                return CompilationUnit::unparsed(id, path, source, reason);
            }
        };

        let symbols = resolve(&parsed, &id, index);
        debug!(
            unit = %id,
            decls = parsed.decls.len(),
            type_refs = parsed.type_refs.len(),
            resolved = symbols.scope().is_ok(),
            "loaded unit"
        );
        CompilationUnit::new(id, path, source, parsed, symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_extensions() {
        let fe = ScalaFrontEnd::new();
        assert!(fe.can_load(Path::new("src/Foo.scala")));
        assert!(!fe.can_load(Path::new("src/Foo.java")));
        assert!(!fe.can_load(Path::new("Makefile")));
    }

    #[test]
    fn frontend_load_unparsable_is_unresolved() {
        let fe = ScalaFrontEnd::new();
        let unit = fe.load(
            UnitId::new("Bad.scala"),
            PathBuf::from("Bad.scala"),
            SourceText::new("trait {"),
            &ProgramIndex::new(),
        );
        assert!(!unit.is_resolved());
        assert!(unit.decls().is_empty());
        assert!(unit.symbols().scope().unwrap_err().starts_with("parse error"));
    }

    #[test]
    fn frontend_header_reads_targets() {
        let fe = ScalaFrontEnd::new();
        let header = fe.header(&SourceText::new("package x.y\nimport a.b.C\nimport d._\n\ntrait T"));
        assert_eq!(header.package_name().to_string(), "x.y");
        let targets: Vec<String> = header.import_targets().iter().map(ToString::to_string).collect();
        assert_eq!(targets, vec!["a.b.C", "d"]);
        assert!(header.error.is_none());
    }

    #[test]
    fn frontend_header_collects_names() {
        let fe = ScalaFrontEnd::new();
        let header = fe.header(&SourceText::new(
            "package a\ntrait Api[F[_]] { def get: F[Foo] }\nclass Impl(f: Foo[Future]) extends Api[IO]\n",
        ));
        assert_eq!(header.declared.iter().collect::<Vec<_>>(), vec!["Api", "Impl"]);
        assert!(header.referenced.contains("Foo"));
        assert!(header.referenced.contains("Api"));

        let broken = fe.header(&SourceText::new("package a\nimport b.C\ntrait X {\n"));
        assert!(broken.error.is_none());
        assert_eq!(broken.import_targets().len(), 1);
        assert!(broken.declared.is_empty());
    }
}
