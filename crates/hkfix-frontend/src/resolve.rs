//! Scope resolution against the program index
//!
//! Resolution snapshots, for every name a unit applies in type position, the
//! declarations that name can refer to. The snapshot is taken once when the
//! unit is loaded; later changes to the index are only seen by reloading.

use crate::ast::{Declaration, ImportSelector, MemberKind};
use crate::parser::ParsedUnit;
use crate::unit::CompilationUnit;
use hkfix_source::{QualifiedName, UnitId};
use hkfix_symbol::{IndexedSymbol, Namespace, ProgramIndex, SymbolKind};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Semantic information of a unit
#[derive(Debug, Clone)]
pub enum SymbolTable {
    /// Names resolved
    Resolved(Scope),
    /// Resolution failed; queries on this unit must fail
    Unresolved {
        /// Why resolution failed
        reason: String,
    },
}

impl SymbolTable {
    /// Resolved scope, or the reason it is missing
    ///
    /// # Errors
    /// Returns the unresolved reason
    pub fn scope(&self) -> Result<&Scope, &str> {
        match self {
            Self::Resolved(scope) => Ok(scope),
            Self::Unresolved { reason } => Err(reason),
        }
    }
}

/// Where a name's candidates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingOrigin {
    /// `import a.Foo`
    ExplicitImport,
    /// `import a._`
    WildcardImport,
    /// Same package, another unit
    Package,
}

/// Candidates for one simple name
#[derive(Debug, Clone)]
pub struct Binding {
    pub origin: BindingOrigin,
    pub candidates: Vec<IndexedSymbol>,
}

/// Names visible in a unit
#[derive(Debug, Clone, Default)]
pub struct Scope {
    package: QualifiedName,
    locals: BTreeSet<String>,
    bindings: IndexMap<String, Binding>,
}

impl Scope {
    /// Package the unit belongs to
    #[inline]
    #[must_use]
    pub fn package(&self) -> &QualifiedName {
        &self.package
    }

    /// Check if the unit itself declares `name` at top level
    #[inline]
    #[must_use]
    pub fn is_local(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    /// Binding for a referenced name
    #[inline]
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Candidate declarations for a referenced name
    #[must_use]
    pub fn candidates(&self, name: &str) -> &[IndexedSymbol] {
        self.bindings
            .get(name)
            .map_or(&[], |b| b.candidates.as_slice())
    }
}

/// Resolve a parsed unit against the index
///
/// Returns [`SymbolTable::Unresolved`] when an import names a member of an
/// in-program package (or holder) that does not exist, the way a compiler
/// would stop on a missing symbol.
#[must_use]
pub fn resolve(parsed: &ParsedUnit, unit: &UnitId, index: &ProgramIndex) -> SymbolTable {
    let package = parsed
        .package
        .as_ref()
        .map(|p| p.name.clone())
        .unwrap_or_default();

    for import in &parsed.imports {
        for target in import.targets() {
            if index.has_package(&target) {
                continue;
            }
            let Some(parent) = target.parent() else {
                continue;
            };
            if index.has_package(&parent) && lookup_path(index, &target).is_empty() {
                return SymbolTable::Unresolved {
                    reason: format!("cannot resolve import {target}"),
                };
            }
        }
    }

    let locals: BTreeSet<String> = parsed
        .decls
        .iter()
        .filter_map(Declaration::name)
        .map(str::to_string)
        .collect();

    let mut bindings: IndexMap<String, Binding> = IndexMap::new();
    for type_ref in &parsed.type_refs {
        let name = type_ref.name.as_str();
        if locals.contains(name) || bindings.contains_key(name) {
            continue;
        }
        if let Some(binding) = bind(parsed, &package, unit, index, name) {
            bindings.insert(name.to_string(), binding);
        }
    }

    SymbolTable::Resolved(Scope {
        package,
        locals,
        bindings,
    })
}

fn bind(
    parsed: &ParsedUnit,
    package: &QualifiedName,
    unit: &UnitId,
    index: &ProgramIndex,
    name: &str,
) -> Option<Binding> {
    let explicit: Vec<IndexedSymbol> = parsed
        .imports
        .iter()
        .flat_map(|import| {
            import.selectors.iter().filter_map(move |s| match s {
                ImportSelector::Name { name: member, rename } => {
                    let visible = rename.as_deref().unwrap_or(member);
                    (visible == name && visible != "_").then(|| import.prefix.child(member.clone()))
                }
                ImportSelector::Wildcard => None,
            })
        })
        .flat_map(|target| lookup_path(index, &target))
        .collect();
    if !explicit.is_empty() {
        return Some(Binding {
            origin: BindingOrigin::ExplicitImport,
            candidates: explicit,
        });
    }

    let wildcard: Vec<IndexedSymbol> = parsed
        .imports
        .iter()
        .filter(|import| import.is_wildcard())
        .filter(|import| {
            // `import a.{Foo => _, _}` hides Foo
            !import.selectors.iter().any(|s| {
                matches!(s, ImportSelector::Name { name: n, rename: Some(r) } if n == name && r == "_")
            })
        })
        .flat_map(|import| lookup_path(index, &import.prefix.child(name)))
        .collect();
    if !wildcard.is_empty() {
        return Some(Binding {
            origin: BindingOrigin::WildcardImport,
            candidates: wildcard,
        });
    }

    let same_package: Vec<IndexedSymbol> = index
        .lookup(&package.child(name))
        .into_iter()
        .filter(|s| s.unit() != unit)
        .collect();
    (!same_package.is_empty()).then_some(Binding {
        origin: BindingOrigin::Package,
        candidates: same_package,
    })
}

/// Look a path up as a top-level symbol, or as a member of a holder
fn lookup_path(index: &ProgramIndex, path: &QualifiedName) -> Vec<IndexedSymbol> {
    let direct = index.lookup(path);
    if !direct.is_empty() {
        return direct;
    }
    let (Some(parent), Some(last)) = (path.parent(), path.last()) else {
        return Vec::new();
    };
    index
        .lookup_in(&parent, Namespace::Term)
        .iter()
        .filter(|s| s.kind() == SymbolKind::Holder)
        .flat_map(|holder| holder.members().iter().filter(move |m| m.simple_name() == last))
        .cloned()
        .collect()
}

/// Symbols a unit contributes to the program index
#[must_use]
pub fn exported_symbols(unit: &CompilationUnit) -> Vec<IndexedSymbol> {
    let package = unit.package_name();
    let symbol = |name: QualifiedName, kind| IndexedSymbol::new(name, kind, unit.id().clone());

    unit.decls()
        .iter()
        .filter_map(|decl| match decl {
            Declaration::Interface(i) => Some(
                symbol(package.child(i.name.clone()), SymbolKind::Interface)
                    .with_type_params(i.type_params.iter().map(|p| p.kind).collect()),
            ),
            Declaration::MetadataHolder(h) => {
                let name = package.child(h.name.clone());
                let nested = h.nested.iter().map(|i| {
                    symbol(name.child(i.name.clone()), SymbolKind::Interface)
                        .with_type_params(i.type_params.iter().map(|p| p.kind).collect())
                });
                let others = h.members.iter().filter_map(|m| {
                    let kind = match m.kind {
                        MemberKind::Object => SymbolKind::Holder,
                        MemberKind::Class => SymbolKind::Class,
                        MemberKind::Type => SymbolKind::TypeAlias,
                        _ => return None,
                    };
                    Some(symbol(name.child(m.name.clone()), kind))
                });
                let members: Vec<IndexedSymbol> = nested.chain(others).collect();
                Some(
                    members
                        .into_iter()
                        .fold(symbol(name.clone(), SymbolKind::Holder), IndexedSymbol::with_member),
                )
            }
            Declaration::Other(o) => {
                let (Some(name), Some(kind)) = (&o.name, o.symbol_kind) else {
                    return None;
                };
                Some(symbol(package.child(name.clone()), kind))
            }
        })
        .collect()
}
