//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every section is optional: a missing section is an absent option group,
//! which leaves the matching phase inactive for the command.
//!
//! ```toml
//! [loading]
//! threads = "HOST_CPUS"
//!
//! [build]
//! jobs = 16
//!
//! [package]
//! globbing_threads = 100
//!
//! [analysis]
//! cpu_heavy_pool_size = 4
//! use_prioritization = true
//! ```

use super::thread_count::{ThreadCount, host_cpus};
use phasepool_application::OptionsProvider;
use phasepool_domain::{
    AnalysisOptions, BuildRequestOptions, LoadingPhaseThreadsOptions, MAX_POOL_PARALLELISM,
    OptionGroup, OptionGroupId, PackageOptions,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroThreadCount(&'static str),

    #[error("{key} resolves to {value} threads; at most {max} are allowed")]
    ThreadCountTooLarge {
        key: &'static str,
        value: usize,
        max: usize,
    },
}

/// `[loading]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoadingConfig {
    /// Threads for the loading/analysis phase
    pub threads: ThreadCount,
}

/// `[build]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBuildConfig {
    /// Concurrent jobs in the execution phase
    pub jobs: ThreadCount,
}

/// `[package]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePackageConfig {
    /// Threads for file globbing during package loading
    pub globbing_threads: ThreadCount,
}

impl Default for FilePackageConfig {
    fn default() -> Self {
        Self {
            globbing_threads: ThreadCount::Fixed(100),
        }
    }
}

/// `[analysis]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnalysisConfig {
    /// Capacity reserved for CPU-heavy evaluation work (0 disables it)
    pub cpu_heavy_pool_size: ThreadCount,
    /// Use one prioritized pool instead of a separate cpu-heavy pool
    pub use_prioritization: bool,
}

impl Default for FileAnalysisConfig {
    fn default() -> Self {
        Self {
            cpu_heavy_pool_size: ThreadCount::Fixed(0),
            use_prioritization: false,
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading: Option<FileLoadingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<FileBuildConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<FilePackageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<FileAnalysisConfig>,
}

impl FileConfig {
    /// Validate the configuration against this host
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.validate_for_host(host_cpus())
    }

    /// Validate the configuration for a host with `host_cpus` CPUs
    pub fn validate_for_host(&self, host_cpus: usize) -> Result<(), ConfigValidationError> {
        // An explicit zero would silently disable a phase the user configured
        if let Some(loading) = &self.loading
            && loading.threads.is_zero()
        {
            return Err(ConfigValidationError::ZeroThreadCount("loading.threads"));
        }
        if let Some(build) = &self.build
            && build.jobs.is_zero()
        {
            return Err(ConfigValidationError::ZeroThreadCount("build.jobs"));
        }
        if let Some(package) = &self.package
            && package.globbing_threads.is_zero()
        {
            return Err(ConfigValidationError::ZeroThreadCount(
                "package.globbing_threads",
            ));
        }

        let counts = [
            ("loading.threads", self.loading.as_ref().map(|c| c.threads)),
            ("build.jobs", self.build.as_ref().map(|c| c.jobs)),
            (
                "package.globbing_threads",
                self.package.as_ref().map(|c| c.globbing_threads),
            ),
            (
                "analysis.cpu_heavy_pool_size",
                self.analysis.as_ref().map(|c| c.cpu_heavy_pool_size),
            ),
        ];
        for (key, count) in counts {
            if let Some(count) = count
                && count.resolve(host_cpus) > MAX_POOL_PARALLELISM
            {
                return Err(ConfigValidationError::ThreadCountTooLarge {
                    key,
                    value: count.resolve(host_cpus),
                    max: MAX_POOL_PARALLELISM,
                });
            }
        }
        Ok(())
    }

    /// Resolve thread expressions against this host.
    pub fn into_options(self) -> FileOptions {
        FileOptions::new(self, host_cpus())
    }
}

/// [`OptionsProvider`] backed by a loaded [`FileConfig`].
#[derive(Debug, Clone)]
pub struct FileOptions {
    config: FileConfig,
    host_cpus: usize,
}

impl FileOptions {
    pub fn new(config: FileConfig, host_cpus: usize) -> Self {
        Self { config, host_cpus }
    }

    pub fn config(&self) -> &FileConfig {
        &self.config
    }

    pub fn host_cpus(&self) -> usize {
        self.host_cpus
    }
}

impl OptionsProvider for FileOptions {
    fn lookup(&self, id: OptionGroupId) -> Option<OptionGroup> {
        let cpus = self.host_cpus;
        match id {
            OptionGroupId::LoadingPhaseThreads => self.config.loading.as_ref().map(|c| {
                LoadingPhaseThreadsOptions {
                    threads: c.threads.resolve(cpus),
                }
                .into()
            }),
            OptionGroupId::BuildRequest => self.config.build.as_ref().map(|c| {
                BuildRequestOptions {
                    jobs: c.jobs.resolve(cpus),
                }
                .into()
            }),
            OptionGroupId::Package => self.config.package.as_ref().map(|c| {
                PackageOptions {
                    globbing_threads: c.globbing_threads.resolve(cpus),
                }
                .into()
            }),
            OptionGroupId::Analysis => self.config.analysis.as_ref().map(|c| {
                AnalysisOptions {
                    cpu_heavy_pool_size: c.cpu_heavy_pool_size.resolve(cpus),
                    use_prioritization: c.use_prioritization,
                }
                .into()
            }),
        }
    }
}
