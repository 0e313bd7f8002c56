//! # Run Lifecycle
//!
//! Wiring for a provisioning run: spawning the in-memory cloud actor, handing
//! its client to the orchestrator, and shutting it down cleanly afterwards.
//!
//! Shutdown drops every client so the actor's receiver returns `None`, then
//! awaits the actor task.

pub mod deploy_system;
pub mod tracing;

pub use self::deploy_system::*;
pub use self::tracing::*;
