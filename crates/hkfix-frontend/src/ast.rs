//! Syntax of a compilation unit
//!
//! Only the parts of the language the rules look at are modelled precisely:
//! traits, objects and the abstract method signatures inside traits. Every
//! other top-level declaration is kept as an opaque [`OtherDecl`].

use crate::lexer::Span;
use hkfix_source::QualifiedName;
use hkfix_symbol::{SymbolKind, TypeParamKind};
use serde::Serialize;
use std::fmt;

/// Position of a declaration within its unit's top level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeclId(pub usize);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `package a.b` (consecutive clauses are merged)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageClause {
    /// Package name
    pub name: QualifiedName,
    /// Span of the clause(s)
    pub span: Span,
}

/// One import clause: `import a.b.C`, `import a.b._`, `import a.b.{C, D => E}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    /// Path before the selectors (`a.b`)
    pub prefix: QualifiedName,
    /// Imported selectors
    pub selectors: Vec<ImportSelector>,
    /// From the `import` keyword to the end of the clause
    pub span: Span,
}

/// A name brought in by an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ImportSelector {
    /// `C` or `C => D`
    Name {
        /// Imported member
        name: String,
        /// Local alias (`_` hides the member)
        rename: Option<String>,
    },
    /// `_` or `*`
    Wildcard,
}

impl Import {
    /// Check if this clause makes `path` visible, either by name or through
    /// a wildcard on its enclosing package
    #[must_use]
    pub fn imports(&self, path: &QualifiedName) -> bool {
        let (Some(parent), Some(last)) = (path.parent(), path.last()) else {
            return false;
        };
        if parent != self.prefix {
            return false;
        }
        self.selectors.iter().any(|s| match s {
            ImportSelector::Wildcard => true,
            ImportSelector::Name { name, rename } => {
                name == last && rename.as_deref().map_or(true, |r| r == last)
            }
        })
    }

    /// Fully qualified targets (`a.b.C` for names, `a.b` for wildcards)
    #[must_use]
    pub fn targets(&self) -> Vec<QualifiedName> {
        self.selectors
            .iter()
            .map(|s| match s {
                ImportSelector::Wildcard => self.prefix.clone(),
                ImportSelector::Name { name, .. } => self.prefix.child(name.clone()),
            })
            .collect()
    }

    /// Check for a wildcard selector
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.selectors.contains(&ImportSelector::Wildcard)
    }
}

/// Top-level declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    /// `trait`
    Interface(Interface),
    /// `object`
    MetadataHolder(MetadataHolder),
    /// Anything else (`class`, `case object`, `type`, `val`, ...)
    Other(OtherDecl),
}

/// Declaration kind, for [`Declaration`] queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    /// `trait`
    Interface,
    /// `object`
    MetadataHolder,
    /// Anything else
    Other,
}

impl Declaration {
    /// Declaration kind
    #[must_use]
    pub fn kind(&self) -> DeclKind {
        match self {
            Self::Interface(_) => DeclKind::Interface,
            Self::MetadataHolder(_) => DeclKind::MetadataHolder,
            Self::Other(_) => DeclKind::Other,
        }
    }

    /// Declared name, if any
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Interface(i) => Some(&i.name),
            Self::MetadataHolder(h) => Some(&h.name),
            Self::Other(o) => o.name.as_deref(),
        }
    }

    /// Span from the defining keyword to the end of the declaration
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Interface(i) => i.span,
            Self::MetadataHolder(h) => h.span,
            Self::Other(o) => o.span,
        }
    }

    /// Borrow as interface
    #[must_use]
    pub fn as_interface(&self) -> Option<&Interface> {
        match self {
            Self::Interface(i) => Some(i),
            _ => None,
        }
    }

    /// Borrow as holder
    #[must_use]
    pub fn as_holder(&self) -> Option<&MetadataHolder> {
        match self {
            Self::MetadataHolder(h) => Some(h),
            _ => None,
        }
    }
}

/// Braced body: offsets of `{` and `}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Body {
    /// Offset of the opening brace
    pub open: usize,
    /// Offset of the closing brace
    pub close: usize,
}

impl Body {
    /// Span including both braces
    #[inline]
    #[must_use]
    pub fn span(self) -> Span {
        Span::new(self.open, self.close + 1)
    }

    /// Text between the braces
    #[inline]
    #[must_use]
    pub fn inner(self, text: &str) -> &str {
        Span::new(self.open + 1, self.close).text(text)
    }
}

/// Declared type parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeParam {
    /// Name (`_` for anonymous parameters)
    pub name: String,
    /// `*` or `* -> *`
    pub kind: TypeParamKind,
    /// Span of the parameter including bounds
    pub span: Span,
}

/// Parent in an `extends ... with ...` clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentRef {
    /// Parent name as written
    pub name: QualifiedName,
    /// Text between the brackets of the first type argument list
    pub type_args: Option<String>,
    /// Span of the whole parent reference
    pub span: Span,
}

/// `trait Name[..] extends .. { .. }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub name: String,
    pub name_span: Span,
    /// From `trait` to the end of the body (or header)
    pub span: Span,
    pub type_params: Vec<TypeParam>,
    /// Span of `[..]` after the name
    pub type_params_span: Option<Span>,
    pub parents: Vec<ParentRef>,
    /// Abstract methods, in source order
    pub methods: Vec<MethodSig>,
    /// Any concrete method, value, type or statement in the body
    pub has_concrete_members: bool,
    pub body: Option<Body>,
}

impl Interface {
    /// The single type parameter, if there is exactly one
    #[must_use]
    pub fn single_type_param(&self) -> Option<&TypeParam> {
        match self.type_params.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Check if any parent's last segment equals `name`
    #[must_use]
    pub fn extends(&self, name: &str) -> bool {
        self.parents.iter().any(|p| p.name.last() == Some(name))
    }

    /// Check if the trait has no type parameters
    #[inline]
    #[must_use]
    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// `object Name { .. }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataHolder {
    pub name: String,
    pub name_span: Span,
    /// From `object` to the end of the body (or header)
    pub span: Span,
    /// Member definitions in source order
    pub members: Vec<MemberBinding>,
    /// Traits nested directly in the body
    pub nested: Vec<Interface>,
    pub body: Option<Body>,
}

impl MetadataHolder {
    /// Name of the declaration this holder is paired with
    ///
    /// Pairing is purely by name; a holder never points at its interface.
    #[inline]
    #[must_use]
    pub fn companion_name(&self) -> &str {
        &self.name
    }

    /// Check if a member with this name exists
    #[must_use]
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m.name == name)
    }

    /// Nested trait by name
    #[must_use]
    pub fn nested_interface(&self, name: &str) -> Option<&Interface> {
        self.nested.iter().find(|i| i.name == name)
    }
}

/// Kind of a member inside a holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum MemberKind {
    Def,
    Val,
    Var,
    Type,
    Trait,
    Object,
    Class,
}

/// Named member of a holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberBinding {
    pub name: String,
    pub kind: MemberKind,
    /// Declared `implicit`
    pub implicit: bool,
    pub span: Span,
}

/// Any other top-level declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtherDecl {
    /// Defining keyword (`class`, `case object`, `package object`, ...)
    pub keyword: String,
    pub name: Option<String>,
    /// How the declaration is indexed, if at all
    pub symbol_kind: Option<SymbolKind>,
    pub span: Span,
}

/// Abstract method signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSig {
    pub name: String,
    /// From `def` to the end of the return type
    pub span: Span,
    pub type_params: Vec<TypeParam>,
    /// Text between the brackets of the type parameter clause
    pub type_params_text: Option<String>,
    pub params: Vec<ParamList>,
    pub ret: Option<ReturnType>,
}

impl MethodSig {
    /// Check if the return type is `head[...]`
    #[must_use]
    pub fn returns_applied(&self, head: &str) -> bool {
        self.ret
            .as_ref()
            .is_some_and(|r| r.head == head && r.arg.is_some())
    }
}

/// One parameter list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamList {
    /// `(implicit ..)` or `(using ..)`
    pub implicit: bool,
    /// Declared with `using`
    pub using: bool,
    pub params: Vec<Param>,
    pub span: Span,
}

/// One parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    /// Type text as written
    pub ty: String,
}

impl Param {
    /// `xs: Int*`
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        self.ty.trim_end().ends_with('*')
    }
}

/// Return type of a method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnType {
    /// Full type text
    pub text: String,
    pub span: Span,
    /// Last segment of the leading type constructor (`Future` in `scala.concurrent.Future[A]`)
    pub head: String,
    /// Span of the leading type constructor including any qualifier
    pub head_span: Span,
    /// Argument text when the type is exactly `head[arg]`
    pub arg: Option<String>,
}

/// Type-position reference `Name[` outside a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRef {
    /// Applied name token
    pub name: String,
    /// Span of the name token only
    pub span: Span,
    /// Top-level holder whose body contains the reference
    pub enclosing_holder: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qn(s: &str) -> QualifiedName {
        s.parse().unwrap()
    }

    #[test]
    fn import_matches_exact_and_wildcard() {
        let exact = Import {
            prefix: qn("cats.data"),
            selectors: vec![ImportSelector::Name {
                name: "ReaderT".into(),
                rename: None,
            }],
            span: Span::new(0, 0),
        };
        let wildcard = Import {
            prefix: qn("cats"),
            selectors: vec![ImportSelector::Wildcard],
            span: Span::new(0, 0),
        };
        assert!(exact.imports(&qn("cats.data.ReaderT")));
        assert!(!exact.imports(&qn("cats.data.Kleisli")));
        assert!(wildcard.imports(&qn("cats.~>")));
        assert!(!wildcard.imports(&qn("cats.data.ReaderT")));
        assert_eq!(wildcard.targets(), vec![qn("cats")]);
    }

    #[test]
    fn renamed_import_does_not_count() {
        let renamed = Import {
            prefix: qn("cats.data"),
            selectors: vec![ImportSelector::Name {
                name: "ReaderT".into(),
                rename: Some("R".into()),
            }],
            span: Span::new(0, 0),
        };
        assert!(!renamed.imports(&qn("cats.data.ReaderT")));
    }
}
