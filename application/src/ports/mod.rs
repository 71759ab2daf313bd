//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod error_classifier;
pub mod executor_builder;
pub mod options_provider;
pub mod quiescing_executor;
