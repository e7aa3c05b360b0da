//! hkfix Rules
//!
//! Semantic rewrite rules for generated remote-service interfaces.
//!
//! # Core Concepts
//!
//! - [`query`]: read-only questions about a resolved unit
//! - [`matcher`]: service and reference shapes, as [`MatchResult`]s
//! - [`RewriteRule`]: a rule turns one unit into one [`EditSet`](hkfix_source::EditSet)
//! - [`AddInstances`]: relocates legacy services and attaches derived instances
//! - [`AdaptReferences`]: qualifies references to relocated interfaces
//! - [`RuleRegistry`]: named rules in run order
//!
//! # Example
//!
//! ```rust,ignore
//! use hkfix_rules::{EngineConfig, RuleRegistry};
//!
//! let registry = RuleRegistry::with_defaults(&EngineConfig::default());
//! for rule in registry.iter() {
//!     let edits = rule.rewrite(&unit)?;
//!     let text = edits.apply(unit.source())?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod adapt_references;
mod add_instances;
mod config;
mod error;
pub mod matcher;
pub mod query;
mod registry;
mod rule;
mod state;
pub mod template;

pub use adapt_references::{AdaptReferences, ADAPT_REFERENCES};
pub use add_instances::{AddInstances, ServicePlan, ADD_INSTANCES};
pub use config::{EngineConfig, ImportConfig};
pub use error::{EngineError, Result};
pub use matcher::MatchResult;
pub use query::{RelocatedTarget, ShapePredicate};
pub use registry::{RuleRegistry, UnknownRule};
pub use rule::RewriteRule;
pub use state::{MigrationState, ServiceShape};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
