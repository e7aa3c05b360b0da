//! `add-instances`: attach derived instances to generated services
//!
//! Legacy services are first relocated into their holder as a higher-kinded
//! trait, leaving a non-generic alias behind. Every matched service then gets
//! the reader-transformer and functor bindings its holder is missing.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::matcher::{match_services, MatchResult};
use crate::rule::{validated, RewriteRule};
use crate::state::MigrationState;
use crate::template::{
    functor_k_binding, indent_block, line_indent, reader_t_binding, render_functor_k, render_nested_interface,
    render_reader_t,
};
use hkfix_frontend::{CompilationUnit, Declaration, Interface, MetadataHolder};
use hkfix_source::{EditSet, EditSpan, QualifiedName};

/// Rule name
pub const ADD_INSTANCES: &str = "add-instances";

/// Edits planned for one matched service
#[derive(Debug, Clone)]
pub struct ServicePlan {
    /// The match the plan was built from
    pub matched: MatchResult,
    /// Final state of the service
    pub state: MigrationState,
    /// Bindings the plan emits, by name
    pub bindings: Vec<String>,
    /// Spans for this service
    pub spans: Vec<EditSpan>,
}

/// Rule A
#[derive(Debug, Clone, Default)]
pub struct AddInstances {
    config: EngineConfig,
}

impl AddInstances {
    /// Create the rule
    #[inline]
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plan every matched service of `unit`, legacy first
    ///
    /// # Errors
    /// Propagates matcher errors
    pub fn plan(&self, unit: &CompilationUnit) -> Result<Vec<ServicePlan>> {
        Ok(match_services(unit, &self.config)?
            .into_iter()
            .filter_map(|matched| self.plan_service(unit, matched))
            .collect())
    }

    fn plan_service(&self, unit: &CompilationUnit, matched: MatchResult) -> Option<ServicePlan> {
        let text = unit.source().as_str();
        let interface = matched.interface(unit)?;
        let holder = matched
            .holder_id()
            .and_then(|id| unit.decl(id))
            .and_then(Declaration::as_holder);
        let name = interface.name.as_str();

        let mut state = MigrationState::of(&matched)?.advance();
        let mut entries = Vec::new();
        let mut spans = Vec::new();

        if state.relocates() {
            entries.push(render_nested_interface(text, interface, &self.config));
        }

        let mut bindings = Vec::new();
        let has = |binding: &str| holder.is_some_and(|h| h.has_member(binding));
        let reader_t = reader_t_binding(name);
        if !has(&reader_t) {
            entries.push(render_reader_t(name, &interface.methods, &self.config));
            bindings.push(reader_t);
        }
        let functor_k = functor_k_binding(name);
        if !has(&functor_k) {
            entries.push(render_functor_k(name, &interface.methods, &self.config));
            bindings.push(functor_k);
        }

        if state.relocates() {
            let alias = format!("trait {name} extends {name}.{name}[{}]", self.config.async_type);
            match holder {
                Some(holder) => {
                    spans.push(EditSpan::replace(interface.span.start, interface.span.end, alias));
                    spans.push(insert_into_holder(text, holder, &entries));
                }
                None => {
                    let created = create_holder(text, interface, &entries);
                    spans.push(EditSpan::replace(
                        interface.span.start,
                        interface.span.end,
                        format!("{alias}\n\n{created}"),
                    ));
                }
            }
        } else if !entries.is_empty() {
            spans.push(match holder {
                Some(holder) => insert_into_holder(text, holder, &entries),
                None => EditSpan::insert(
                    interface.span.end,
                    format!("\n\n{}", create_holder(text, interface, &entries)),
                ),
            });
        }

        state = state.advance();
        Some(ServicePlan {
            matched,
            state,
            bindings,
            spans,
        })
    }

    /// Imports the emitted bindings need that the unit does not have yet
    #[must_use]
    pub fn missing_imports<'c>(&'c self, unit: &CompilationUnit) -> Vec<&'c QualifiedName> {
        self.config
            .imports
            .all()
            .into_iter()
            .filter(|path| !unit.imports().iter().any(|i| i.imports(path)))
            .collect()
    }

    /// One insertion carrying every missing import
    fn import_span(&self, unit: &CompilationUnit) -> Option<EditSpan> {
        let missing = self.missing_imports(unit);
        if missing.is_empty() {
            return None;
        }
        let lines: Vec<String> = missing.iter().map(|path| format!("import {path}")).collect();
        let lines = lines.join("\n");

        let span = if let Some(last) = unit.imports().iter().map(|i| i.span.end).max() {
            EditSpan::insert(last, format!("\n{lines}"))
        } else if let Some(package) = unit.package() {
            EditSpan::insert(package.span.end, format!("\n\n{lines}"))
        } else {
            EditSpan::insert(0, format!("{lines}\n\n"))
        };
        Some(span)
    }
}

/// `object Name {\n<entries>\n}` at the interface's indentation
fn create_holder(text: &str, interface: &Interface, entries: &[String]) -> String {
    let indent = line_indent(text, interface.span.start);
    format!(
        "{indent}object {} {{\n{}\n{indent}}}",
        interface.name,
        render_entries(entries, &format!("{indent}  "))
    )
}

/// Append entries before a holder's closing brace, giving it a body if needed
fn insert_into_holder(text: &str, holder: &MetadataHolder, entries: &[String]) -> EditSpan {
    let holder_indent = line_indent(text, holder.span.start);
    let member_indent = holder.members.first().map_or_else(
        || format!("{holder_indent}  "),
        |m| line_indent(text, m.span.start).to_string(),
    );
    let rendered = render_entries(entries, &member_indent);

    let Some(body) = holder.body else {
        return EditSpan::insert(holder.span.end, format!(" {{\n{rendered}\n{holder_indent}}}"));
    };

    let line_start = text[..body.close].rfind('\n').map_or(0, |nl| nl + 1);
    let close_on_own_line = line_start > body.open && text[line_start..body.close].trim().is_empty();
    if close_on_own_line {
        let separator = if body.inner(text).trim().is_empty() { "" } else { "\n" };
        EditSpan::insert(line_start, format!("{separator}{rendered}\n"))
    } else {
        EditSpan::insert(body.close, format!("\n{rendered}\n{holder_indent}"))
    }
}

fn render_entries(entries: &[String], indent: &str) -> String {
    entries
        .iter()
        .map(|entry| indent_block(entry, indent))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl RewriteRule for AddInstances {
    fn name(&self) -> &'static str {
        ADD_INSTANCES
    }

    fn is_idempotent(&self) -> bool {
        true
    }

    fn rewrite(&self, unit: &CompilationUnit) -> Result<EditSet> {
        let mut edits = EditSet::new(ADD_INSTANCES, unit.source());
        let mut emitted = false;
        for plan in self.plan(unit)? {
            emitted |= !plan.bindings.is_empty();
            for span in plan.spans {
                edits.push(span);
            }
        }
        if emitted {
            if let Some(span) = self.import_span(unit) {
                edits.push(span);
            }
        }
        validated(unit, edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ServiceShape;
    use hkfix_symbol::ProgramIndex;
    use hkfix_test_utils::{apply, load_unit, LEGACY_SERVICE, MODERN_SERVICE, MODERN_SERVICE_COMPLETE};
    use pretty_assertions::assert_eq;

    fn rewrite(src: &str) -> String {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "a/Foo.scala", src);
        let edits = AddInstances::default().rewrite(&unit).unwrap();
        apply(&unit, &edits)
    }

    #[test]
    fn add_instances_modern_creates_holder() {
        let out = rewrite("package a\n\ntrait Foo[F[_]] {\n  def m(x: Int): F[String]\n}\n");
        assert_eq!(
            out,
            "package a\n\nimport cats.data.ReaderT\nimport cats.tagless.FunctorK\nimport cats.~>\n\n\
             trait Foo[F[_]] {\n  def m(x: Int): F[String]\n}\n\n\
             object Foo {\n  \
             implicit def FooReaderT[F[_]]: Foo[ReaderT[F, Foo[F], *]] = new Foo[ReaderT[F, Foo[F], *]] {\n    \
             def m(x: Int): ReaderT[F, Foo[F], String] = ReaderT(_.m(x))\n  \
             }\n\n  \
             implicit val FooFunctorK: FunctorK[Foo] = new FunctorK[Foo] {\n    \
             def mapK[F[_], G[_]](af: Foo[F])(fk: F ~> G): Foo[G] = new Foo[G] {\n      \
             def m(x: Int): G[String] = fk(af.m(x))\n    \
             }\n  \
             }\n\
             }\n"
        );
    }

    #[test]
    fn add_instances_legacy_without_holder() {
        let out = rewrite(
            "package a\n\nimport com.twitter.util.Future\n\ntrait Foo[Future] extends ThriftService {\n  def m: Future[Int]\n}\n",
        );
        assert_eq!(
            out,
            "package a\n\nimport com.twitter.util.Future\nimport cats.data.ReaderT\nimport cats.tagless.FunctorK\nimport cats.~>\n\n\
             trait Foo extends Foo.Foo[Future]\n\n\
             object Foo {\n  \
             trait Foo[F[_]] extends ThriftService {\n    def m: F[Int]\n  }\n\n  \
             implicit def FooReaderT[F[_]]: Foo[ReaderT[F, Foo[F], *]] = new Foo[ReaderT[F, Foo[F], *]] {\n    \
             def m: ReaderT[F, Foo[F], Int] = ReaderT(_.m)\n  \
             }\n\n  \
             implicit val FooFunctorK: FunctorK[Foo] = new FunctorK[Foo] {\n    \
             def mapK[F[_], G[_]](af: Foo[F])(fk: F ~> G): Foo[G] = new Foo[G] {\n      \
             def m: G[Int] = fk(af.m)\n    \
             }\n  \
             }\n\
             }\n"
        );
    }

    #[test]
    fn add_instances_legacy_with_holder_appends() {
        let out = rewrite(
            "import cats._\nimport cats.data._\nimport cats.tagless._\n\
             trait Foo[Future] extends ThriftService {\n  def m: Future[Int]\n}\n\
             object Foo {\n  val Name = \"foo\"\n}\n",
        );
        assert!(out.contains("trait Foo extends Foo.Foo[Future]\nobject Foo {\n  val Name = \"foo\"\n\n  trait Foo[F[_]] extends ThriftService {\n    def m: F[Int]\n  }\n\n  implicit def FooReaderT"));
        assert!(out.ends_with("    }\n  }\n}\n"));
        // wildcard imports already cover every name
        assert!(!out.contains("import cats.data.ReaderT"));
    }

    #[test]
    fn add_instances_braceless_and_empty_holders() {
        let out = rewrite("trait Foo[F[_]] { def m: F[Int] }\nobject Foo\n");
        assert!(out.starts_with("import cats.data.ReaderT\nimport cats.tagless.FunctorK\nimport cats.~>\n\ntrait Foo[F[_]] { def m: F[Int] }\nobject Foo {\n  implicit def FooReaderT"));
        assert!(out.ends_with("  }\n}\n"));

        let out = rewrite("trait Foo[F[_]] { def m: F[Int] }\nobject Foo {}\n");
        assert!(out.contains("object Foo {\n  implicit def FooReaderT"));
        assert!(out.ends_with("  }\n}\n"));
    }

    #[test]
    fn add_instances_skips_existing_bindings() {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "a/Greeter.scala", MODERN_SERVICE_COMPLETE);
        let rule = AddInstances::default();
        assert!(rule.rewrite(&unit).unwrap().is_empty());

        let plans = rule.plan(&unit).unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].state.is_attached());
        assert!(plans[0].bindings.is_empty());

        let partial = load_unit(
            &index,
            "a/P.scala",
            "trait Foo[F[_]] { def m: F[Int] }\nobject Foo {\n  implicit val FooFunctorK: FunctorK[Foo] = ???\n}\n",
        );
        let plans = rule.plan(&partial).unwrap();
        assert_eq!(plans[0].bindings, vec!["FooReaderT"]);
    }

    #[test]
    fn add_instances_plans_legacy_first() {
        let index = ProgramIndex::new();
        let both = format!("{MODERN_SERVICE}\n{}", LEGACY_SERVICE.replace("package com.example.api", "").replace("Greeter", "Old"));
        let unit = load_unit(&index, "a/Both.scala", &both);
        let plans = AddInstances::default().plan(&unit).unwrap();
        assert_eq!(plans.len(), 2);
        assert!(matches!(plans[0].matched, MatchResult::LegacyService { .. }));
        assert_eq!(
            MigrationState::of(&plans[1].matched),
            Some(MigrationState::Unmigrated(ServiceShape::Modern))
        );
        assert!(plans.iter().all(|p| p.state.is_attached()));
    }

    #[test]
    fn add_instances_is_idempotent_on_examples() {
        for src in [LEGACY_SERVICE, MODERN_SERVICE] {
            let once = rewrite(src);
            assert_ne!(once, src);
            assert_eq!(rewrite(&once), once);
        }
    }
}
