//! Embeddable compiler for a small boolean filter language.
//!
//! Filter text such as `Dwelling?.Title = 'House Atreides' and Age >= 3` is
//! tokenized, parsed and type-checked against a whitelist of host members,
//! producing a typed predicate tree. Members are reachable from filter text
//! only after the host registers them:
//!
//! ```
//! use relay::{FilterParser, Registry};
//!
//! let registry = Registry::builder()
//!     .configure::<String>(|t| t.computed("Length", |s: &String| s.len()))
//!     .build()?;
//! let parser = FilterParser::new(registry);
//!
//! let long = parser.parse::<String>("Length > 10")?;
//! assert!(long.evaluate(&"hello world".to_string())?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod dsl;
mod error;
mod filter;
pub mod registry;

pub use config::WhitelistConfig;
pub use error::{EvalError, ParseError};
pub use filter::{FilterParser, Predicate};
pub use registry::{Record, Registry, RegistryBuilder, RegistryError};
