//! Core library for the BLACKLIGHT chat console.
//!
//! The crate owns everything except rendering:
//! - [`agents`] holds backend configuration, the provider adapters and the
//!   orchestrator that routes a call to the adapter of the active mode.
//! - [`selector`] classifies a turn into a task category and ranks models.
//! - [`prompt`] composes the full text prompt sent to text backends.
//! - [`dispatch`] runs a turn end to end and turns failures into status turns.
//! - [`session`] keeps the in-memory conversation and its export document.
//! - [`api`] exposes the user intents a presentation layer emits.
//! - [`errors`] and [`logging`] carry the error catalogue and event log.

pub mod agents;
pub mod api;
pub mod dispatch;
pub mod errors;
pub mod logging;
pub mod prompt;
pub mod selector;
pub mod session;

pub use errors::{BlacklightError, Result};
