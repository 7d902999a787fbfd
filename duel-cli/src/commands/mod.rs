//! CLI command implementations.

mod console;
pub mod host;
pub mod join;
