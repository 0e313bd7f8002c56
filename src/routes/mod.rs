//! Route registry: which HTTP routes the gateway serves, which handler backs
//! each one, and which of them require an API key.

mod definition;
pub mod error;
mod table;

pub use definition::*;
pub use error::*;
pub use table::*;
