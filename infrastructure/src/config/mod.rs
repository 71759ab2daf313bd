//! Configuration loading for phasepool
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Command-line overrides
//! 2. Environment: `PHASEPOOL_<SECTION>__<KEY>`
//! 3. `--config <path>` specified file
//! 4. Project root: `./phasepool.toml` or `./.phasepool.toml`
//! 5. Global config: `<config_dir>/phasepool/config.toml`
//! 6. Default values (every option group absent)

mod file_config;
mod loader;
mod thread_count;

pub use file_config::{
    ConfigValidationError, FileAnalysisConfig, FileBuildConfig, FileConfig, FileLoadingConfig,
    FileOptions, FilePackageConfig,
};
pub use loader::{ConfigLoader, ConfigOverrides, ConfigSource};
pub use thread_count::{ThreadCount, ThreadCountError, host_cpus};
