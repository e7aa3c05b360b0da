//! Tree query layer
//!
//! Read-only questions the matchers ask about a [`CompilationUnit`]. Every
//! query is restartable and fails with [`EngineError::SemanticUnavailable`]
//! when the unit's symbol table is unresolved.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use hkfix_frontend::{CompilationUnit, DeclId, DeclKind, Declaration, Interface, MetadataHolder, Scope};
use hkfix_source::QualifiedName;
use hkfix_symbol::{IndexedSymbol, SymbolKind, TypeParamKind};
use std::collections::BTreeMap;

/// Resolved scope of a unit, or [`EngineError::SemanticUnavailable`]
///
/// # Errors
/// Fails when the unit could not be parsed or resolved
pub fn scope_of(unit: &CompilationUnit) -> Result<&Scope> {
    unit.symbols()
        .scope()
        .map_err(|reason| EngineError::SemanticUnavailable {
            unit: unit.id().clone(),
            reason: reason.to_string(),
        })
}

/// Top-level declarations of `kind`, in source order
///
/// # Errors
/// Fails when semantic information is unavailable
pub fn declarations_of_kind(unit: &CompilationUnit, kind: DeclKind) -> Result<Vec<(DeclId, &Declaration)>> {
    scope_of(unit)?;
    Ok(unit.decls_with_ids().filter(|(_, d)| d.kind() == kind).collect())
}

/// Holder paired with `interface` by exact name
///
/// # Errors
/// - [`EngineError::SemanticUnavailable`] when the unit is unresolved
/// - [`EngineError::AmbiguousMatch`] when two holders carry that name
pub fn resolve_companion<'u>(
    unit: &'u CompilationUnit,
    interface: &Interface,
) -> Result<Option<(DeclId, &'u MetadataHolder)>> {
    let holders: Vec<(DeclId, &MetadataHolder)> = declarations_of_kind(unit, DeclKind::MetadataHolder)?
        .into_iter()
        .filter_map(|(id, d)| d.as_holder().map(|h| (id, h)))
        .filter(|(_, h)| h.companion_name() == interface.name)
        .collect();

    match holders.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        many => Err(ambiguous(
            unit,
            &interface.name,
            many.iter().map(|(_, h)| describe(unit, "object", &h.name, h.span.start)),
        )),
    }
}

/// Top-level interfaces named `name`
///
/// # Errors
/// - [`EngineError::SemanticUnavailable`] when the unit is unresolved
/// - [`EngineError::AmbiguousMatch`] when more than one exists
pub fn unique_interface<'u>(unit: &'u CompilationUnit, name: &str) -> Result<Option<(DeclId, &'u Interface)>> {
    let found: Vec<(DeclId, &Interface)> = declarations_of_kind(unit, DeclKind::Interface)?
        .into_iter()
        .filter_map(|(id, d)| d.as_interface().map(|i| (id, i)))
        .filter(|(_, i)| i.name == name)
        .collect();

    match found.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        many => Err(ambiguous(
            unit,
            name,
            many.iter().map(|(_, i)| describe(unit, "trait", &i.name, i.span.start)),
        )),
    }
}

/// Structural predicate over interface declarations
pub trait ShapePredicate {
    /// Check if `interface` has this shape
    fn matches(&self, interface: &Interface) -> bool;
}

/// Single `* -> *` parameter that every method returns
#[derive(Debug, Clone, Copy, Default)]
pub struct HigherKindedService;

impl ShapePredicate for HigherKindedService {
    fn matches(&self, interface: &Interface) -> bool {
        let Some(param) = interface.single_type_param() else {
            return false;
        };
        param.kind == TypeParamKind::HigherKinded && is_service_body(interface, &param.name)
    }
}

/// Single proper parameter named after the async type, extending the marker
#[derive(Debug, Clone, Copy)]
pub struct ExtendsMarker<'c> {
    /// Marker name (last segment)
    pub marker: &'c str,
    /// Concrete async type
    pub async_type: &'c str,
}

impl<'c> ExtendsMarker<'c> {
    /// Predicate for the configured marker and async type
    #[must_use]
    pub fn from_config(config: &'c EngineConfig) -> Self {
        Self {
            marker: config.marker_name(),
            async_type: &config.async_type,
        }
    }
}

impl ShapePredicate for ExtendsMarker<'_> {
    fn matches(&self, interface: &Interface) -> bool {
        let Some(param) = interface.single_type_param() else {
            return false;
        };
        param.kind == TypeParamKind::Proper
            && param.name == self.async_type
            && interface.extends(self.marker)
            && is_service_body(interface, self.async_type)
    }
}

/// At least one method, nothing concrete, every method returns `head[..]`
fn is_service_body(interface: &Interface, head: &str) -> bool {
    !interface.methods.is_empty()
        && !interface.has_concrete_members
        && interface.methods.iter().all(|m| m.returns_applied(head))
}

/// Top-level interfaces satisfying `predicate`, in source order
///
/// # Errors
/// Fails when semantic information is unavailable
pub fn interfaces_matching<'u>(
    unit: &'u CompilationUnit,
    predicate: &dyn ShapePredicate,
) -> Result<Vec<(DeclId, &'u Interface)>> {
    Ok(declarations_of_kind(unit, DeclKind::Interface)?
        .into_iter()
        .filter_map(|(id, d)| d.as_interface().map(|i| (id, i)))
        .filter(|(_, i)| predicate.matches(i))
        .collect())
}

/// A migrated interface: top-level `P.N` plus holder `P.N` nesting `P.N.N`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocatedTarget {
    /// Package declaring the interface
    pub package: QualifiedName,
    /// Simple name shared by the interface, holder and nested interface
    pub name: String,
}

impl RelocatedTarget {
    /// `P.N`
    #[must_use]
    pub fn holder_path(&self) -> QualifiedName {
        self.package.child(self.name.clone())
    }

    /// `P.N.N`
    #[must_use]
    pub fn nested_path(&self) -> QualifiedName {
        self.holder_path().child(self.name.clone())
    }
}

/// Relocated target a simple name resolves to in `unit`
///
/// Looks only at the candidates the unit's scope binds `name` to.
///
/// # Errors
/// - [`EngineError::SemanticUnavailable`] when the unit is unresolved
/// - [`EngineError::AmbiguousMatch`] when relocated targets exist in more
///   than one package
pub fn resolve_relocated(unit: &CompilationUnit, name: &str) -> Result<Option<RelocatedTarget>> {
    let scope = scope_of(unit)?;

    let mut by_package: BTreeMap<QualifiedName, Vec<&IndexedSymbol>> = BTreeMap::new();
    for candidate in scope.candidates(name) {
        if candidate.simple_name() == name {
            by_package.entry(candidate.parent()).or_default().push(candidate);
        }
    }

    let targets: Vec<QualifiedName> = by_package
        .into_iter()
        .filter(|(_, symbols)| is_relocated(symbols, name))
        .map(|(package, _)| package)
        .collect();

    match targets.as_slice() {
        [] => Ok(None),
        [package] => Ok(Some(RelocatedTarget {
            package: package.clone(),
            name: name.to_string(),
        })),
        many => Err(ambiguous(unit, name, many.iter().map(ToString::to_string))),
    }
}

fn is_relocated(symbols: &[&IndexedSymbol], name: &str) -> bool {
    let alias = symbols
        .iter()
        .any(|s| s.kind() == SymbolKind::Interface && s.type_params().is_empty());
    let holder = symbols.iter().any(|s| {
        s.kind() == SymbolKind::Holder
            && s.member(name, SymbolKind::Interface)
                .is_some_and(IndexedSymbol::is_higher_kinded_interface)
    });
    alias && holder
}

pub(crate) fn ambiguous(
    unit: &CompilationUnit,
    name: &str,
    candidates: impl IntoIterator<Item = String>,
) -> EngineError {
    EngineError::AmbiguousMatch {
        unit: unit.id().clone(),
        name: name.to_string(),
        candidates: candidates.into_iter().collect(),
    }
}

pub(crate) fn describe(unit: &CompilationUnit, keyword: &str, name: &str, offset: usize) -> String {
    let (line, column) = unit.source().line_col(offset);
    format!("{keyword} {name} at {line}:{column}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hkfix_symbol::ProgramIndex;
    use hkfix_test_utils::{load_unit, register_unit, LEGACY_SERVICE, MODERN_SERVICE, ORDINARY_TRAIT};

    const MIGRATED: &str = "package a\n\ntrait Foo extends Foo.Foo[Future]\n\nobject Foo {\n  trait Foo[F[_]] {\n    def m: F[Int]\n  }\n}\n";

    #[test]
    fn query_declarations_in_source_order() {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "a/Foo.scala", MIGRATED);
        let interfaces = declarations_of_kind(&unit, DeclKind::Interface).unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].0, DeclId(0));
        let holders = declarations_of_kind(&unit, DeclKind::MetadataHolder).unwrap();
        assert_eq!(holders[0].1.name(), Some("Foo"));
    }

    #[test]
    fn query_unresolved_unit_fails() {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "bad.scala", "trait Foo[F[_]] {");
        let err = declarations_of_kind(&unit, DeclKind::Interface).unwrap_err();
        assert!(err.is_skip());
        assert!(resolve_relocated(&unit, "Foo").is_err());
    }

    #[test]
    fn query_companion_by_exact_name() {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "a/Foo.scala", "package a\ntrait Foo[F[_]] { def m: F[Int] }\nobject foo\nobject Foo\n");
        let (_, decl) = declarations_of_kind(&unit, DeclKind::Interface).unwrap()[0];
        let interface = decl.as_interface().unwrap();
        let (id, holder) = resolve_companion(&unit, interface).unwrap().unwrap();
        assert_eq!(id, DeclId(2));
        assert_eq!(holder.name, "Foo");
    }

    #[test]
    fn query_duplicate_companions_are_ambiguous() {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "a/Foo.scala", "package a\ntrait Foo[F[_]] { def m: F[Int] }\nobject Foo\nobject Foo\n");
        let (_, decl) = declarations_of_kind(&unit, DeclKind::Interface).unwrap()[0];
        let err = resolve_companion(&unit, decl.as_interface().unwrap()).unwrap_err();
        let EngineError::AmbiguousMatch { candidates, .. } = err else {
            panic!("expected ambiguity");
        };
        assert_eq!(candidates, vec!["object Foo at 3:1", "object Foo at 4:1"]);
    }

    #[test]
    fn query_shape_predicates() {
        let index = ProgramIndex::new();
        let config = EngineConfig::new();

        let legacy = load_unit(&index, "L.scala", LEGACY_SERVICE);
        assert_eq!(interfaces_matching(&legacy, &ExtendsMarker::from_config(&config)).unwrap().len(), 1);
        assert!(interfaces_matching(&legacy, &HigherKindedService).unwrap().is_empty());

        let modern = load_unit(&index, "M.scala", MODERN_SERVICE);
        assert_eq!(interfaces_matching(&modern, &HigherKindedService).unwrap().len(), 1);
        assert!(interfaces_matching(&modern, &ExtendsMarker::from_config(&config)).unwrap().is_empty());

        let ordinary = load_unit(&index, "O.scala", ORDINARY_TRAIT);
        assert!(interfaces_matching(&ordinary, &HigherKindedService).unwrap().is_empty());
    }

    #[test]
    fn query_shape_rejects_partial_services() {
        let index = ProgramIndex::new();
        let cases = [
            // no methods
            "trait Foo[F[_]]",
            // one method not returning F
            "trait Foo[F[_]] { def a: F[Int]; def b: Int }",
            // concrete member
            "trait Foo[F[_]] { def a: F[Int]; def b: F[Int] = a }",
            // two parameters
            "trait Foo[F[_], G[_]] { def a: F[Int] }",
        ];
        for src in cases {
            let unit = load_unit(&index, "X.scala", src);
            assert!(interfaces_matching(&unit, &HigherKindedService).unwrap().is_empty(), "{src}");
        }
    }

    #[test]
    fn query_resolve_relocated() {
        let index = ProgramIndex::new();
        register_unit(&index, "a/Foo.scala", MIGRATED);

        let user = load_unit(&index, "b/U.scala", "package b\nimport a.Foo\nclass U(f: Foo[IO])\n");
        let target = resolve_relocated(&user, "Foo").unwrap().unwrap();
        assert_eq!(target.package.to_string(), "a");
        assert_eq!(target.nested_path().to_string(), "a.Foo.Foo");

        // Unmigrated interfaces are not relocated
        let index = ProgramIndex::new();
        register_unit(&index, "a/Foo.scala", "package a\ntrait Foo[F[_]] { def m: F[Int] }\n");
        let user = load_unit(&index, "b/U.scala", "package b\nimport a.Foo\nclass U(f: Foo[IO])\n");
        assert_eq!(resolve_relocated(&user, "Foo").unwrap(), None);
    }

    #[test]
    fn query_relocated_in_two_packages_is_ambiguous() {
        let index = ProgramIndex::new();
        register_unit(&index, "a/Foo.scala", MIGRATED);
        register_unit(&index, "c/Foo.scala", &MIGRATED.replacen("package a", "package c", 1));

        let user = load_unit(&index, "b/U.scala", "package b\nimport a._\nimport c._\nclass U(f: Foo[IO])\n");
        let err = resolve_relocated(&user, "Foo").unwrap_err();
        assert!(matches!(err, EngineError::AmbiguousMatch { ref candidates, .. } if candidates == &["a", "c"]));
    }
}
