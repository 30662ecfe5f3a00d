//! # when-engine
//!
//! Deterministic resolution of user-typed scheduling times.
//!
//! A scheduling CLI lets users say when a message should go out in
//! free-form English — "in 5 minutes", "tomorrow at 9am", "next monday at
//! 3pm", a literal "now", or an exact RFC 3339 timestamp. This crate turns
//! such an expression, together with a single caller-supplied clock
//! reading, into one unambiguous UTC instant (or a typed parse error).
//! Nothing here reads the system clock or performs I/O.
//!
//! ## Modules
//!
//! - [`resolver`] — normalization, the grammars, and the canonical formatter
//! - [`error`] — error types

pub mod error;
pub mod resolver;

pub use error::ResolveError;
pub use resolver::{format_canonical, resolve, ResolvedInstant};
