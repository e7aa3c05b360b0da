//! hkfix Driver
//!
//! Runs the rewrite rules over a whole program, upstream packages first.
//!
//! # Core Concepts
//!
//! - [`HkfixConfig`]: `hkfix.toml`, engine names plus driver settings
//! - [`discover_sources`]: `.gitignore`-aware source discovery
//! - [`DependencyGraph`]: package dependencies, sorted leaf-first
//! - [`Storage`]: where texts come from and go to
//! - [`Driver`]: the read / order / rewrite / persist pipeline
//! - [`Report`]: per-unit outcomes and diffs
//!
//! # Example
//!
//! ```rust,ignore
//! use hkfix_driver::{Driver, HkfixConfig};
//!
//! let config = HkfixConfig::discover(None).await?.with_dry_run(true);
//! let report = Driver::new(config)?.run(&["src/main/scala".into()]).await?;
//! print!("{}", report.diffs());
//! std::process::exit(report.exit_code());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod discovery;
mod driver;
mod error;
mod graph;
mod report;
mod storage;

pub use config::{DriverConfig, HkfixConfig, CONFIG_FILE};
pub use discovery::discover_sources;
pub use driver::Driver;
pub use error::{DriverError, Result};
pub use graph::DependencyGraph;
pub use report::{unified_diff, Report, UnitOutcome, UnitReport};
pub use storage::{FsStorage, MemoryStorage, Storage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
