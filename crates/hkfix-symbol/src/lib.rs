//! hkfix Symbol Index
//!
//! The program-wide declaration index rules resolve references against.
//!
//! # Overview
//!
//! - **IndexedSymbol**: One declaration with its kind, unit and type shape
//! - **ProgramIndex**: Lookup by qualified name and package via radix tree
//!
//! # Example
//!
//! ```rust
//! use hkfix_source::{QualifiedName, UnitId};
//! use hkfix_symbol::{IndexedSymbol, ProgramIndex, SymbolKind};
//!
//! let index = ProgramIndex::new();
//! let unit = UnitId::new("Greeter.scala");
//! let name: QualifiedName = "com.example.Greeter".parse().unwrap();
//! let symbol = IndexedSymbol::new(name.clone(), SymbolKind::Interface, unit.clone());
//!
//! index
//!     .register_unit(&unit, "com.example".parse().unwrap(), vec![symbol])
//!     .unwrap();
//! assert_eq!(index.lookup(&name).len(), 1);
//! ```

#![warn(missing_docs)]

pub mod index;
pub mod symbol;

// Re-exports
pub use index::{IndexError, ProgramIndex};
pub use symbol::{IndexedSymbol, Namespace, SymbolKind, TypeParamKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
