//! Loaded compilation units

use crate::ast::{DeclId, Declaration, Import, PackageClause, TypeRef};
use crate::parser::ParsedUnit;
use crate::resolve::SymbolTable;
use hkfix_source::{QualifiedName, SourceText, UnitId};
use std::path::{Path, PathBuf};

/// One source file after parsing and resolution
///
/// Immutable once built; every rule pass sees a fresh unit built from the
/// text produced by the previous pass.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    id: UnitId,
    path: PathBuf,
    source: SourceText,
    package: Option<PackageClause>,
    imports: Vec<Import>,
    decls: Vec<Declaration>,
    type_refs: Vec<TypeRef>,
    symbols: SymbolTable,
}

impl CompilationUnit {
    /// Assemble a unit from its parsed syntax and symbol table
    #[must_use]
    pub fn new(id: UnitId, path: PathBuf, source: SourceText, parsed: ParsedUnit, symbols: SymbolTable) -> Self {
        Self {
            id,
            path,
            source,
            package: parsed.package,
            imports: parsed.imports,
            decls: parsed.decls,
            type_refs: parsed.type_refs,
            symbols,
        }
    }

    /// A unit whose text could not be parsed
    #[must_use]
    pub fn unparsed(id: UnitId, path: PathBuf, source: SourceText, reason: impl Into<String>) -> Self {
        Self::new(
            id,
            path,
            source,
            ParsedUnit::default(),
            SymbolTable::Unresolved {
                reason: reason.into(),
            },
        )
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &SourceText {
        &self.source
    }

    /// Package clause, if any
    #[inline]
    #[must_use]
    pub fn package(&self) -> Option<&PackageClause> {
        self.package.as_ref()
    }

    /// Package name (root when there is no clause)
    #[must_use]
    pub fn package_name(&self) -> QualifiedName {
        self.package
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// Top-level imports in source order
    #[inline]
    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Top-level declarations in source order
    #[inline]
    #[must_use]
    pub fn decls(&self) -> &[Declaration] {
        &self.decls
    }

    /// Declarations paired with their ids
    pub fn decls_with_ids(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls.iter().enumerate().map(|(i, d)| (DeclId(i), d))
    }

    /// Declaration by id
    #[inline]
    #[must_use]
    pub fn decl(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0)
    }

    /// Type-position references in source order
    #[inline]
    #[must_use]
    pub fn type_refs(&self) -> &[TypeRef] {
        &self.type_refs
    }

    #[inline]
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Check if semantic information is available
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.symbols, SymbolTable::Resolved(_))
    }
}
