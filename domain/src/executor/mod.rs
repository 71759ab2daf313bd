//! Executor selection concepts.
//!
//! - [`plan`]: the closed set of pool topologies and their preconditions
//! - [`task`]: task kinds, task errors, classifications, quiescence summaries
//! - [`error`]: precondition violations

pub mod error;
pub mod plan;
pub mod task;
