//! Rule A then rule B across units, processed the way the driver does

use hkfix_frontend::{exported_symbols, CompilationUnit};
use hkfix_rules::{AdaptReferences, AddInstances, EngineConfig, RewriteRule, RuleRegistry};
use hkfix_symbol::ProgramIndex;
use hkfix_test_utils::{load_unit, LEGACY_SERVICE, ORDINARY_TRAIT};
use pretty_assertions::assert_eq;

const A: &str = "package a

trait Foo[Future] extends ThriftService {
  def foo(x: Int): Future[Int]
}
";

const B: &str = "package b

import a.Foo

trait Bar[Future] extends ThriftService {
  def bar(): Future[String]
}

class BarImpl(foo: Foo[Future])
";

const C: &str = "package c

import b.Bar

class Client(bar: Bar[IO])
";

/// Every selected rule in order, reloading in between, then register
fn process(index: &ProgramIndex, id: &str, src: &str, rules: &[&dyn RewriteRule]) -> String {
    let mut unit = load_unit(index, id, src);
    for rule in rules {
        let edits = rule.rewrite(&unit).unwrap();
        let text = edits.apply(unit.source()).unwrap();
        unit = load_unit(index, id, text.as_str());
    }
    register(index, &unit);
    unit.source().as_str().to_string()
}

fn register(index: &ProgramIndex, unit: &CompilationUnit) {
    index
        .register_unit(unit.id(), unit.package_name(), exported_symbols(unit))
        .unwrap();
}

fn both() -> (AddInstances, AdaptReferences) {
    (AddInstances::new(EngineConfig::new()), AdaptReferences::new())
}

#[test]
fn leaf_first_order_adapts_every_reference() {
    let index = ProgramIndex::new();
    let (a_rule, b_rule) = both();
    let rules: [&dyn RewriteRule; 2] = [&a_rule, &b_rule];

    let a = process(&index, "a/Foo.scala", A, &rules);
    assert!(a.contains("trait Foo extends Foo.Foo[Future]"));

    let b = process(&index, "b/Bar.scala", B, &rules);
    assert!(b.contains("trait Bar extends Bar.Bar[Future]"));
    assert!(b.contains("class BarImpl(foo: Foo.Foo[Future])"));

    let c = process(&index, "c/Client.scala", C, &rules);
    assert_eq!(c, "package c\n\nimport b.Bar\n\nclass Client(bar: Bar.Bar[IO])\n");
}

#[test]
fn out_of_order_fails_to_match() {
    let index = ProgramIndex::new();
    let (a_rule, b_rule) = both();
    let rules: [&dyn RewriteRule; 2] = [&a_rule, &b_rule];

    // C before B: Bar is not known yet
    let c = process(&index, "c/Client.scala", C, &rules);
    assert_eq!(c, C);

    // B before A: Foo is not relocated yet
    let b = process(&index, "b/Bar.scala", B, &rules);
    assert!(b.contains("class BarImpl(foo: Foo[Future])"));
}

#[test]
fn adapt_references_qualifies_twice() {
    let index = ProgramIndex::new();
    let (a_rule, b_rule) = both();
    process(&index, "a/Foo.scala", A, &[&a_rule]);
    process(&index, "b/Bar.scala", B, &[&a_rule]);

    let once = process(&index, "c/Client.scala", C, &[&b_rule]);
    assert!(once.contains("Bar.Bar[IO]"));

    let twice = process(&index, "c/Client.scala", &once, &[&b_rule]);
    assert!(twice.contains("class Client(bar: Bar.Bar.Bar[IO])"));
}

#[test]
fn registry_runs_rules_in_order() {
    let index = ProgramIndex::new();
    let registry = RuleRegistry::with_defaults(&EngineConfig::new());
    let rules = registry.select(&["adapt-references", "add-instances"]).unwrap();
    let refs: Vec<&dyn RewriteRule> = rules.iter().map(|r| &**r).collect();

    let out = process(&index, "api/Greeter.scala", LEGACY_SERVICE, &refs);
    assert!(out.contains("trait Greeter extends Greeter.Greeter[Future]"));
    assert!(out.contains("object Greeter {\n  trait Greeter[F[_]] extends ThriftService {"));
}

#[test]
fn ordinary_code_is_untouched() {
    let index = ProgramIndex::new();
    let (a_rule, b_rule) = both();
    let out = process(&index, "util/Clock.scala", ORDINARY_TRAIT, &[&a_rule, &b_rule]);
    assert_eq!(out, ORDINARY_TRAIT);
}

#[test]
fn legacy_shape_variants_are_covered() {
    let (a_rule, _) = both();
    let cases = [
        // qualified marker
        "trait S[Future] extends com.twitter.finagle.thrift.ThriftService { def m: Future[Int] }",
        // marker mixed in after another parent
        "trait S[Future] extends Closable with ThriftService { def m: Future[Int] }",
        // qualified async return type
        "trait S[Future] extends ThriftService { def m: com.twitter.util.Future[Int] }",
        // annotation and modifiers before the trait
        "@Generated(Array(\"scrooge\"))\nsealed trait S[Future] extends ThriftService {\n  def m(x: Int)(implicit t: Timer): Future[Int]\n}",
    ];
    for src in cases {
        let index = ProgramIndex::new();
        let unit = load_unit(&index, "S.scala", src);
        let plans = a_rule.plan(&unit).unwrap();
        assert_eq!(plans.len(), 1, "{src}");
        assert!(plans[0].state.is_attached());
        let out = process(&index, "S.scala", src, &[&a_rule]);
        assert!(out.contains("trait S extends S.S[Future]"), "{out}");
    }
}

#[test]
fn add_instances_output_reloads_resolved() {
    let index = ProgramIndex::new();
    let (a_rule, _) = both();
    let unit = load_unit(&index, "a/Foo.scala", A);
    let text = a_rule.rewrite(&unit).unwrap().apply(unit.source()).unwrap();
    assert!(text.as_str().contains("import cats.~>"));

    let reloaded = load_unit(&index, "a/Foo.scala", text.as_str());
    assert!(reloaded.is_resolved(), "{:?}", reloaded.symbols().scope().err());
    assert!(reloaded
        .imports()
        .iter()
        .flat_map(|i| i.targets())
        .any(|t| t.to_string() == "cats.~>"));
    assert!(a_rule.rewrite(&reloaded).unwrap().is_empty());
}

#[test]
fn same_unit_references_follow_the_relocation() {
    let index = ProgramIndex::new();
    let (a_rule, b_rule) = both();
    let src = format!("{A}\nclass FooImpl(f: Foo[Future])\n");
    let out = process(&index, "a/Foo.scala", &src, &[&a_rule, &b_rule]);
    assert!(out.contains("trait Foo extends Foo.Foo[Future]"), "{out}");
    assert!(out.contains("class FooImpl(f: Foo.Foo[Future])"), "{out}");
}
