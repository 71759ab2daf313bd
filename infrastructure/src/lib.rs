//! Infrastructure layer for phasepool
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration file loading and the
//! tokio-backed executor pools.

pub mod config;
pub mod executor;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigOverrides, ConfigSource, ConfigValidationError, FileAnalysisConfig,
    FileBuildConfig, FileConfig, FileLoadingConfig, FileOptions, FilePackageConfig, ThreadCount,
    ThreadCountError, host_cpus,
};
pub use executor::{NamedPool, PooledExecutor, TokioExecutorBuilder};
