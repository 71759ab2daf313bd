//! Application-level configuration.
//!
//! - [`ParallelismSettings`]: versioned, server-scoped holder of the current snapshot

pub mod parallelism_settings;

pub use parallelism_settings::ParallelismSettings;
