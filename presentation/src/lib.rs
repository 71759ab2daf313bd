//! Presentation layer for phasepool
//!
//! This crate contains the CLI definitions and the console and JSON
//! formatters for snapshots, executor plans and run summaries.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat, OverrideArgs, PhaseArg};
pub use output::console::{ConsoleFormatter, PhasePlan};
