//! hkfix Front-end
//!
//! Turns Scala source text into semantically resolved compilation units.
//!
//! # Pipeline
//!
//! 1. [`lexer`]: text to tokens with byte spans
//! 2. [`parser`]: tokens to top-level declarations, imports and type references
//! 3. [`resolve`]: referenced names to candidate declarations in the
//!    [`ProgramIndex`](hkfix_symbol::ProgramIndex)
//!
//! The whole pipeline runs behind the [`FrontEnd`] trait.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod ast;
pub mod error;
mod frontend;
pub mod lexer;
pub mod parser;
pub mod resolve;
mod unit;

pub use ast::{
    Body, DeclId, DeclKind, Declaration, Import, ImportSelector, Interface, MemberBinding, MemberKind,
    MetadataHolder, MethodSig, OtherDecl, PackageClause, Param, ParamList, ParentRef, ReturnType,
    TypeParam, TypeRef,
};
pub use error::ParseError;
pub use frontend::{FrontEnd, ScalaFrontEnd, UnitHeader};
pub use lexer::Span;
pub use resolve::{exported_symbols, Binding, BindingOrigin, Scope, SymbolTable};
pub use unit::CompilationUnit;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
