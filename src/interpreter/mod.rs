//! The block interpreter: per-run variables, the execution context and the
//! recursive engine that walks the block tree.

pub mod context;
pub mod engine;
pub mod variable;

#[cfg(test)]
mod tests;

pub use context::Context;
pub use engine::{execute, run, Control};
pub use variable::Variable;
