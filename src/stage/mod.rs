//! Stage resolution: maps a stage identifier to its deployment parameters.
//!
//! Resolution is a pure lookup into a compiled-in table. Parsing the raw
//! identifier is the only fallible part; once a [`Stage`] exists,
//! [`StageResolver::config_for`] is total.

mod config;
mod error;
mod resolver;

pub use config::*;
pub use error::*;
pub use resolver::*;
