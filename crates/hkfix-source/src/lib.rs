//! hkfix source primitives
//!
//! Content-addressed source texts and the atomic edits applied to them.
//!
//! # Core Concepts
//!
//! - [`SourceText`]: Immutable text of one compilation unit plus its hash
//! - [`ContentHash`]: 32-byte Blake3 hash binding edits to a text
//! - [`EditSpan`]: One replacement over a byte range
//! - [`EditSet`]: Non-overlapping spans from one rule, applied all-or-nothing
//! - [`QualifiedName`]: Dotted package/declaration names
//!
//! # Example
//!
//! ```rust,ignore
//! use hkfix_source::{EditSet, EditSpan, SourceText};
//!
//! let base = SourceText::new("val x: Foo[IO] = impl");
//! let mut edits = EditSet::new("adapt-references", &base);
//! edits.push(EditSpan::insert(7, "Foo."));
//! let out = edits.apply(&base)?;
//! assert_eq!(out.as_str(), "val x: Foo.Foo[IO] = impl");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod edit;
mod hash;
mod path;
mod source;

pub use edit::{EditError, EditSet, EditSpan};
pub use hash::ContentHash;
pub use path::{PathError, QualifiedName};
pub use source::{SourceText, UnitId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
