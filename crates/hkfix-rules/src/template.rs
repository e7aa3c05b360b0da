//! Text templates for generated code
//!
//! Templates render unindented text; callers place it with [`indent_block`].

use crate::config::EngineConfig;
use hkfix_frontend::{Interface, MethodSig};
use std::fmt::Write as _;

/// Name of the reader-transformer binding for `service`
#[must_use]
pub fn reader_t_binding(service: &str) -> String {
    format!("{service}ReaderT")
}

/// Name of the functor binding for `service`
#[must_use]
pub fn functor_k_binding(service: &str) -> String {
    format!("{service}FunctorK")
}

/// Parameter as it appears in a generated signature and call
struct RenderedParam {
    name: String,
    ty: String,
    repeated: bool,
}

struct RenderedList {
    implicit: bool,
    using: bool,
    params: Vec<RenderedParam>,
}

/// Parameter lists with anonymous parameters given usable names
fn rendered_lists(method: &MethodSig) -> Vec<RenderedList> {
    let mut anonymous = 0;
    method
        .params
        .iter()
        .map(|list| RenderedList {
            implicit: list.implicit,
            using: list.using,
            params: list
                .params
                .iter()
                .map(|p| {
                    let name = if p.name == "_" {
                        anonymous += 1;
                        format!("ev{anonymous}")
                    } else {
                        p.name.clone()
                    };
                    RenderedParam {
                        name,
                        ty: p.ty.clone(),
                        repeated: p.is_repeated(),
                    }
                })
                .collect(),
        })
        .collect()
}

/// `def m[A](x: A)(implicit y: Y): <ret>`, keeping `using` clauses
fn signature(method: &MethodSig, lists: &[RenderedList], ret: &str) -> String {
    let mut out = format!("def {}", method.name);
    if let Some(tparams) = &method.type_params_text {
        let _ = write!(out, "[{tparams}]");
    }
    for list in lists {
        out.push('(');
        if list.using {
            out.push_str("using ");
        } else if list.implicit {
            out.push_str("implicit ");
        }
        let params: Vec<String> = list.params.iter().map(|p| format!("{}: {}", p.name, p.ty)).collect();
        out.push_str(&params.join(", "));
        out.push(')');
    }
    let _ = write!(out, ": {ret}");
    out
}

/// `recv.m[A](x)(y)`, passing `using` clauses as `(using y)`
fn call(receiver: &str, method: &MethodSig, lists: &[RenderedList]) -> String {
    let mut out = format!("{receiver}.{}", method.name);
    if !method.type_params.is_empty() {
        let names: Vec<&str> = method.type_params.iter().map(|p| p.name.as_str()).collect();
        let _ = write!(out, "[{}]", names.join(", "));
    }
    for list in lists {
        let args: Vec<String> = list
            .params
            .iter()
            .map(|p| {
                if p.repeated {
                    format!("{}: _*", p.name)
                } else {
                    p.name.clone()
                }
            })
            .collect();
        let using = if list.using { "using " } else { "" };
        let _ = write!(out, "({using}{})", args.join(", "));
    }
    out
}

fn result_type(method: &MethodSig) -> &str {
    method
        .ret
        .as_ref()
        .and_then(|r| r.arg.as_deref())
        .unwrap_or("Unit")
}

/// Implicit conversion of `service` into its reader-transformer form
#[must_use]
pub fn render_reader_t(service: &str, methods: &[MethodSig], config: &EngineConfig) -> String {
    let f = &config.effect_param;
    let reader = config.imports.reader_t_name();
    let applied = format!("{service}[{reader}[{f}, {service}[{f}], *]]");

    let mut out = format!(
        "implicit def {}[{f}[_]]: {applied} = new {applied} {{\n",
        reader_t_binding(service)
    );
    for method in methods {
        let lists = rendered_lists(method);
        let ret = format!("{reader}[{f}, {service}[{f}], {}]", result_type(method));
        let _ = writeln!(
            out,
            "  {} = {reader}({})",
            signature(method, &lists, &ret),
            call("_", method, &lists)
        );
    }
    out.push('}');
    out
}

/// Implicit functor instance for `service`
#[must_use]
pub fn render_functor_k(service: &str, methods: &[MethodSig], config: &EngineConfig) -> String {
    let f = &config.effect_param;
    let g = if f == "G" { "H" } else { "G" };
    let functor = config.imports.functor_k_name();
    let arrow = config.imports.arrow_name();

    let mut out = format!(
        "implicit val {}: {functor}[{service}] = new {functor}[{service}] {{\n",
        functor_k_binding(service)
    );
    let _ = writeln!(
        out,
        "  def mapK[{f}[_], {g}[_]](af: {service}[{f}])(fk: {f} {arrow} {g}): {service}[{g}] = new {service}[{g}] {{"
    );
    for method in methods {
        let lists = rendered_lists(method);
        let ret = format!("{g}[{}]", result_type(method));
        let _ = writeln!(
            out,
            "    {} = fk({})",
            signature(method, &lists, &ret),
            call("af", method, &lists)
        );
    }
    out.push_str("  }\n}");
    out
}

/// Relocated copy of a legacy interface, generic in the effect parameter
///
/// Method return heads are replaced with the effect parameter; every other
/// byte of the body is kept. The body keeps its original indentation and
/// the closing brace sits at column zero.
#[must_use]
pub fn render_nested_interface(text: &str, interface: &Interface, config: &EngineConfig) -> String {
    let f = &config.effect_param;
    let mut out = format!("trait {}[{f}[_]]", interface.name);

    if let (Some(first), Some(last)) = (interface.parents.first(), interface.parents.last()) {
        let _ = write!(out, " extends {}", &text[first.span.start..last.span.end]);
    }

    let Some(body) = interface.body else {
        return out;
    };

    let mut heads: Vec<(usize, usize)> = interface
        .methods
        .iter()
        .filter_map(|m| m.ret.as_ref())
        .filter(|r| r.head_span.start < r.head_span.end)
        .map(|r| (r.head_span.start, r.head_span.end))
        .collect();
    heads.sort_unstable();

    let mut inner = String::new();
    let mut cursor = body.open + 1;
    for (start, end) in heads {
        inner.push_str(&text[cursor..start]);
        inner.push_str(f);
        cursor = end;
    }
    inner.push_str(&text[cursor..body.close]);

    out.push_str(" {");
    if inner.contains('\n') {
        let mut lines: Vec<&str> = inner.split('\n').collect();
        if let Some(last) = lines.last_mut() {
            if last.trim().is_empty() {
                *last = "";
            }
        }
        out.push_str(&lines.join("\n"));
    } else {
        out.push_str(&inner);
    }
    out.push('}');
    out
}

/// Prefix every non-blank line with `indent`; blank lines become empty
#[must_use]
pub fn indent_block(text: &str, indent: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leading whitespace of the line containing `offset`
#[must_use]
pub fn line_indent(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map_or(0, |nl| nl + 1);
    let line = &text[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}
