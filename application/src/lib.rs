//! Application layer for phasepool
//!
//! This crate contains the port definitions, the server-scoped settings
//! holder, and the executor factory used by the evaluation engine.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ParallelismSettings;
pub use ports::{
    error_classifier::{ErrorClassifier, EvaluatorErrorClassifier},
    executor_builder::{BuildError, ExecutorBuilder},
    options_provider::{OptionsProvider, StaticOptions},
    quiescing_executor::{QuiescingExecutor, Task, TaskSubmitter, task},
};
pub use use_cases::quiescing_executors::{ExecutorError, QuiescingExecutors};
