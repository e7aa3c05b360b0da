//! Parser properties over generated service declarations

use hkfix_frontend::parser::parse;
use hkfix_symbol::TypeParamKind;
use proptest::prelude::*;

fn service(name: &str, methods: &[String], modern: bool) -> String {
    let tparam = if modern { "F[_]" } else { "Future" };
    let head = if modern { "F" } else { "Future" };
    let mut src = format!("package gen\n\ntrait {name}[{tparam}] {{\n");
    for m in methods {
        src.push_str(&format!("  def {m}(x: Int): {head}[String]\n"));
    }
    src.push_str("}\n");
    src
}

proptest! {
    #[test]
    fn parse_recovers_every_method(
        name in "[A-Z][a-zA-Z0-9]{0,8}",
        methods in prop::collection::btree_set("q[a-zA-Z0-9]{0,8}", 1..6),
        modern in any::<bool>(),
    ) {
        let methods: Vec<String> = methods.into_iter().collect();
        let src = service(&name, &methods, modern);
        let parsed = parse(&src).unwrap();

        let interface = parsed.decls[0].as_interface().unwrap();
        prop_assert_eq!(&interface.name, &name);
        let found: Vec<&str> = interface.methods.iter().map(|m| m.name.as_str()).collect();
        prop_assert_eq!(found, methods.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert!(!interface.has_concrete_members);

        let expected = if modern { TypeParamKind::HigherKinded } else { TypeParamKind::Proper };
        prop_assert_eq!(interface.type_params[0].kind, expected);
        prop_assert_eq!(&src[interface.name_span.start..interface.name_span.end], name.as_str());
    }
}
