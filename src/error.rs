//! Library error taxonomy.
//!
//! Validation findings and operator-facing failures travel as structured
//! response mappings, not errors; this enum covers the conditions that make
//! a plan unusable before or during scheduling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed plan construction: duplicate ids or an unrecoverable
    /// template instantiation problem.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A tool name outside the closed catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Dependency cycle or dangling reference; the plan must never run.
    #[error("Cannot resolve execution order for steps: {0:?}")]
    ExecutionOrder(Vec<String>),
}

pub type Result<T> = std::result::Result<T, Error>;
