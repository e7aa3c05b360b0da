//! Indexed symbols
//!
//! An [`IndexedSymbol`] is the program-wide view of one declaration: its
//! qualified name, what kind of declaration it is, which unit declared it and
//! the shape of its type parameters. Metadata holders also carry their
//! members, so that a reader can tell whether an interface was relocated into
//! its holder without opening the declaring unit.

use hkfix_source::{QualifiedName, UnitId};
use serde::Serialize;

/// Declaration kind as seen by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// `trait`
    Interface,

    /// `object` (companion metadata holder)
    Holder,

    /// `class` / `case class`
    Class,

    /// `type` alias
    TypeAlias,

    /// `val` / `def` at package level
    Value,
}

impl SymbolKind {
    /// Namespace the declaration lives in
    ///
    /// A trait and an object of the same name do not clash because they live
    /// in different namespaces.
    #[inline]
    #[must_use]
    pub const fn namespace(self) -> Namespace {
        match self {
            Self::Interface | Self::Class | Self::TypeAlias => Namespace::Type,
            Self::Holder | Self::Value => Namespace::Term,
        }
    }
}

/// Type or term namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Types (traits, classes, aliases)
    Type,
    /// Terms (objects, values)
    Term,
}

/// Kind of a type parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeParamKind {
    /// `*`, e.g. `A`
    Proper,
    /// `* -> *`, e.g. `F[_]`
    HigherKinded,
}

/// A declaration registered in the program index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedSymbol {
    name: QualifiedName,
    kind: SymbolKind,
    unit: UnitId,
    type_params: Vec<TypeParamKind>,
    members: Vec<IndexedSymbol>,
}

impl IndexedSymbol {
    /// Create a symbol with no type parameters and no members
    #[must_use]
    pub fn new(name: QualifiedName, kind: SymbolKind, unit: UnitId) -> Self {
        Self {
            name,
            kind,
            unit,
            type_params: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Set type parameter kinds
    #[must_use]
    pub fn with_type_params(mut self, params: Vec<TypeParamKind>) -> Self {
        self.type_params = params;
        self
    }

    /// Add a nested member
    #[must_use]
    pub fn with_member(mut self, member: IndexedSymbol) -> Self {
        self.members.push(member);
        self
    }

    /// Fully qualified name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Simple (last segment) name
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.last().unwrap_or_default()
    }

    /// Declaration kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    /// Declaring unit
    #[inline]
    #[must_use]
    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    /// Type parameter kinds, in declaration order
    #[inline]
    #[must_use]
    pub fn type_params(&self) -> &[TypeParamKind] {
        &self.type_params
    }

    /// Nested members (holders only)
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[IndexedSymbol] {
        &self.members
    }

    /// Enclosing package or holder
    #[inline]
    #[must_use]
    pub fn parent(&self) -> QualifiedName {
        self.name.parent().unwrap_or_default()
    }

    /// Check if this is a trait with exactly one `* -> *` parameter
    #[must_use]
    pub fn is_higher_kinded_interface(&self) -> bool {
        self.kind == SymbolKind::Interface && self.type_params == [TypeParamKind::HigherKinded]
    }

    /// Find a direct member by simple name and kind
    #[must_use]
    pub fn member(&self, name: &str, kind: SymbolKind) -> Option<&IndexedSymbol> {
        self.members
            .iter()
            .find(|m| m.kind == kind && m.simple_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> QualifiedName {
        s.parse().unwrap()
    }

    #[test]
    fn kind_namespaces() {
        assert_eq!(SymbolKind::Interface.namespace(), Namespace::Type);
        assert_eq!(SymbolKind::Holder.namespace(), Namespace::Term);
        assert_eq!(SymbolKind::Value.namespace(), Namespace::Term);
    }

    #[test]
    fn holder_member_lookup() {
        let unit = UnitId::new("Foo.scala");
        let nested = IndexedSymbol::new(name("a.Foo.Foo"), SymbolKind::Interface, unit.clone())
            .with_type_params(vec![TypeParamKind::HigherKinded]);
        let holder = IndexedSymbol::new(name("a.Foo"), SymbolKind::Holder, unit).with_member(nested);

        let found = holder.member("Foo", SymbolKind::Interface).unwrap();
        assert!(found.is_higher_kinded_interface());
        assert_eq!(found.parent(), name("a.Foo"));
        assert!(holder.member("Foo", SymbolKind::Holder).is_none());
    }
}
