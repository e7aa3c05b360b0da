//! Pattern matchers
//!
//! Matchers turn query results into [`MatchResult`]s. A result only carries
//! indexes into the unit it was computed from.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::query::{
    ambiguous, describe, interfaces_matching, resolve_companion, resolve_relocated, scope_of,
    unique_interface, ExtendsMarker, HigherKindedService, RelocatedTarget,
};
use hkfix_frontend::{CompilationUnit, DeclId, Declaration, Interface, Span, TypeRef};
use hkfix_symbol::TypeParamKind;
use std::collections::HashMap;

/// One match within a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Legacy single-parameter shape
    LegacyService {
        /// Top-level interface
        interface: DeclId,
        /// Paired holder, if present
        holder: Option<DeclId>,
    },
    /// Modern higher-kinded shape
    GeneratedService {
        /// Top-level interface
        interface: DeclId,
        /// Paired holder, if present
        holder: Option<DeclId>,
    },
    /// Reference to a migrated interface
    RelocatedReference {
        /// Index into [`CompilationUnit::type_refs`]
        reference: usize,
        /// What the reference resolves to
        target: RelocatedTarget,
    },
}

impl MatchResult {
    /// Ordering within a pass: legacy before modern before references
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::LegacyService { .. } => 0,
            Self::GeneratedService { .. } => 1,
            Self::RelocatedReference { .. } => 2,
        }
    }

    /// Matched interface declaration
    #[must_use]
    pub fn interface_id(&self) -> Option<DeclId> {
        match self {
            Self::LegacyService { interface, .. } | Self::GeneratedService { interface, .. } => Some(*interface),
            Self::RelocatedReference { .. } => None,
        }
    }

    /// Paired holder declaration
    #[must_use]
    pub fn holder_id(&self) -> Option<DeclId> {
        match self {
            Self::LegacyService { holder, .. } | Self::GeneratedService { holder, .. } => *holder,
            Self::RelocatedReference { .. } => None,
        }
    }

    /// Matched interface, looked up in `unit`
    #[must_use]
    pub fn interface<'u>(&self, unit: &'u CompilationUnit) -> Option<&'u Interface> {
        unit.decl(self.interface_id()?).and_then(Declaration::as_interface)
    }

    /// Matched reference, looked up in `unit`
    #[must_use]
    pub fn reference<'u>(&self, unit: &'u CompilationUnit) -> Option<&'u TypeRef> {
        match self {
            Self::RelocatedReference { reference, .. } => unit.type_refs().get(*reference),
            _ => None,
        }
    }
}

/// Legacy and generated services of a unit, legacy first
///
/// # Errors
/// - `SemanticUnavailable` when the unit is unresolved
/// - `AmbiguousMatch` for duplicate interfaces or holders, or a legacy
///   interface whose holder already nests an interface of the same name
pub fn match_services(unit: &CompilationUnit, config: &EngineConfig) -> Result<Vec<MatchResult>> {
    let mut matches = Vec::new();

    for (id, interface) in interfaces_matching(unit, &ExtendsMarker::from_config(config))? {
        unique_interface(unit, &interface.name)?;
        let holder = resolve_companion(unit, interface)?;
        if let Some((_, h)) = holder {
            if let Some(nested) = h.nested_interface(&interface.name) {
                return Err(ambiguous(
                    unit,
                    &interface.name,
                    [
                        describe(unit, "trait", &interface.name, interface.span.start),
                        describe(unit, "trait", &nested.name, nested.span.start),
                    ],
                ));
            }
        }
        matches.push(MatchResult::LegacyService {
            interface: id,
            holder: holder.map(|(id, _)| id),
        });
    }

    for (id, interface) in interfaces_matching(unit, &HigherKindedService)? {
        unique_interface(unit, &interface.name)?;
        let holder = resolve_companion(unit, interface)?;
        matches.push(MatchResult::GeneratedService {
            interface: id,
            holder: holder.map(|(id, _)| id),
        });
    }

    matches.sort_by_key(MatchResult::rank);
    Ok(matches)
}

/// References to relocated interfaces, in source order
///
/// A reference qualifies when it is outside a holder of the same name and
/// resolves to exactly one relocated target. Names the unit declares itself
/// qualify only when the unit holds the relocated shape, and never inside
/// the alias declaration. Only the applied name token is inspected.
///
/// # Errors
/// - `SemanticUnavailable` when the unit is unresolved
/// - `AmbiguousMatch` when a name resolves to targets in several packages
pub fn match_relocated_references(unit: &CompilationUnit) -> Result<Vec<MatchResult>> {
    let scope = scope_of(unit)?;
    let aliases = local_aliases(unit);
    let mut resolved: HashMap<&str, Option<RelocatedTarget>> = HashMap::new();
    let mut matches = Vec::new();

    for (reference, type_ref) in unit.type_refs().iter().enumerate() {
        let name = type_ref.name.as_str();
        if type_ref.enclosing_holder.as_deref() == Some(name) {
            continue;
        }
        if scope.is_local(name) {
            match aliases.get(name) {
                Some(alias) if !alias.contains(type_ref.span.start) => {
                    matches.push(MatchResult::RelocatedReference {
                        reference,
                        target: RelocatedTarget {
                            package: scope.package().clone(),
                            name: name.to_string(),
                        },
                    });
                }
                _ => {}
            }
            continue;
        }
        let target = match resolved.get(name) {
            Some(target) => target.clone(),
            None => {
                let target = resolve_relocated(unit, name)?;
                resolved.insert(name, target.clone());
                target
            }
        };
        if let Some(target) = target {
            matches.push(MatchResult::RelocatedReference { reference, target });
        }
    }

    Ok(matches)
}

/// Relocated interfaces declared by the unit itself, with their alias spans
///
/// A name qualifies when the unit has a parameterless top-level interface
/// and a holder of that name nesting a higher-kinded interface of that name.
fn local_aliases(unit: &CompilationUnit) -> HashMap<&str, Span> {
    let nests = |name: &str| {
        unit.decls()
            .iter()
            .filter_map(Declaration::as_holder)
            .filter_map(|h| h.nested_interface(name))
            .any(|nested| {
                matches!(nested.type_params.as_slice(), [p] if p.kind == TypeParamKind::HigherKinded)
            })
    };
    unit.decls()
        .iter()
        .filter_map(Declaration::as_interface)
        .filter(|i| i.type_params.is_empty() && nests(&i.name))
        .map(|i| (i.name.as_str(), i.span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use hkfix_symbol::ProgramIndex;
    use hkfix_test_utils::{load_unit, register_unit, LEGACY_SERVICE, ORDINARY_TRAIT};

    #[test]
    fn matcher_legacy_before_modern() {
        let index = ProgramIndex::new();
        let unit = load_unit(
            &index,
            "a/Both.scala",
            "package a\ntrait Modern[F[_]] { def m: F[Int] }\ntrait Old[Future] extends ThriftService { def m: Future[Int] }\nobject Old\n",
        );
        let matches = match_services(&unit, &EngineConfig::new()).unwrap();
        assert_eq!(
            matches,
            vec![
                MatchResult::LegacyService {
                    interface: DeclId(1),
                    holder: Some(DeclId(2)),
                },
                MatchResult::GeneratedService {
                    interface: DeclId(0),
                    holder: None,
                },
            ]
        );
        assert_eq!(matches[0].interface(&unit).unwrap().name, "Old");
    }

    #[test]
    fn matcher_no_match_on_ordinary_trait() {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "O.scala", ORDINARY_TRAIT);
        assert!(match_services(&unit, &EngineConfig::new()).unwrap().is_empty());
    }

    #[test]
    fn matcher_respects_configured_names() {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "L.scala", LEGACY_SERVICE);
        let config = EngineConfig::new().with_marker("AsyncService");
        assert!(match_services(&unit, &config).unwrap().is_empty());

        let task = load_unit(&index, "T.scala", "trait T[Task] extends ThriftService { def m: Task[Int] }");
        let config = EngineConfig::new().with_async_type("Task");
        assert_eq!(match_services(&task, &config).unwrap().len(), 1);
    }

    #[test]
    fn matcher_duplicate_interfaces_are_ambiguous() {
        let index = ProgramIndex::new();
        let unit = load_unit(
            &index,
            "D.scala",
            "trait Foo[F[_]] { def m: F[Int] }\ntrait Foo[F[_]] { def n: F[Int] }\n",
        );
        let err = match_services(&unit, &EngineConfig::new()).unwrap_err();
        assert!(matches!(err, EngineError::AmbiguousMatch { ref name, .. } if name == "Foo"));
    }

    #[test]
    fn matcher_legacy_with_nested_interface_is_ambiguous() {
        let index = ProgramIndex::new();
        let unit = load_unit(
            &index,
            "N.scala",
            "trait Foo[Future] extends ThriftService { def m: Future[Int] }\nobject Foo {\n  trait Foo[F[_]] { def m: F[Int] }\n}\n",
        );
        let err = match_services(&unit, &EngineConfig::new()).unwrap_err();
        let EngineError::AmbiguousMatch { candidates, .. } = err else {
            panic!("expected ambiguity");
        };
        assert_eq!(candidates, vec!["trait Foo at 1:1", "trait Foo at 3:3"]);
    }

    #[test]
    fn matcher_relocated_references() {
        let index = ProgramIndex::new();
        register_unit(
            &index,
            "a/Foo.scala",
            "package a\n\ntrait Foo extends Foo.Foo[Future]\n\nobject Foo {\n  trait Foo[F[_]] {\n    def m: F[Int]\n  }\n}\n",
        );
        let unit = load_unit(
            &index,
            "b/U.scala",
            "package b\nimport a.Foo\nclass U(f: Foo[IO], g: List[Int])\nobject Bar {\n  def x: Foo[IO] = ???\n}\n",
        );
        let matches = match_relocated_references(&unit).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.reference(&unit).unwrap().name == "Foo"));
    }

    #[test]
    fn matcher_skips_references_in_own_holder_and_locals() {
        let index = ProgramIndex::new();
        register_unit(
            &index,
            "a/Foo.scala",
            "package a\n\ntrait Foo extends Foo.Foo[Future]\n\nobject Foo {\n  trait Foo[F[_]] {\n    def m: F[Int]\n  }\n}\n",
        );
        let unit = load_unit(
            &index,
            "b/Foo.scala",
            "package b\nimport a._\nobject Foo {\n  def x: Foo[IO] = ???\n}\n",
        );
        assert!(match_relocated_references(&unit).unwrap().is_empty());
    }

    #[test]
    fn matcher_qualifies_own_relocated_interface_outside_alias() {
        let index = ProgramIndex::new();
        let src = "package a\n\ntrait Foo extends Foo.Foo[Future]\n\nobject Foo {\n  trait Foo[F[_]] {\n    def m: F[Int]\n  }\n  def x: Foo[IO] = ???\n}\n\nclass FooImpl(f: Foo[Future])\n";
        let unit = load_unit(&index, "a/Foo.scala", src);
        let matches = match_relocated_references(&unit).unwrap();
        assert_eq!(matches.len(), 1);
        let reference = matches[0].reference(&unit).unwrap();
        assert_eq!(reference.span.start, src.rfind("Foo[Future]").unwrap());
        let MatchResult::RelocatedReference { target, .. } = &matches[0] else {
            panic!("expected a reference");
        };
        assert_eq!(target.package.to_string(), "a");
    }

    #[test]
    fn matcher_leaves_own_unmigrated_interface_alone() {
        let index = ProgramIndex::new();
        let unit = load_unit(
            &index,
            "a/Foo.scala",
            "package a\ntrait Foo[F[_]] { def m: F[Int] }\nclass FooImpl(f: Foo[IO])\n",
        );
        assert!(match_relocated_references(&unit).unwrap().is_empty());
    }
}
