//! Parallelism snapshot: the normalized sizing of every evaluation phase.
//!
//! A [`ParallelismSnapshot`] is resolved from the option groups of a single
//! command. Absent groups are not errors: they leave the corresponding fields
//! at the inert zero/false state, which is later rejected by the executor
//! plan preconditions if a phase that needs them is actually started.
//!
//! # Resolution
//!
//! | Group | Field(s) | When absent |
//! |-------|----------|-------------|
//! | loading phase threads | `analysis_parallelism` | 0 |
//! | build request | `execution_parallelism` | 0 |
//! | package | `globbing_parallelism` | 0 |
//! | analysis | `cpu_heavy_pool_size`, `use_prioritization` | 0, false |
//!
//! With prioritization enabled the cpu-heavy lane lives inside the analysis
//! pool, so its capacity is clamped to `analysis_parallelism`.

use super::option_group::{
    AnalysisOptions, BuildRequestOptions, LoadingPhaseThreadsOptions, PackageOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the snapshot fields, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotField {
    AnalysisParallelism,
    ExecutionParallelism,
    GlobbingParallelism,
    CpuHeavyPoolSize,
    UsePrioritization,
}

impl SnapshotField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotField::AnalysisParallelism => "analysis_parallelism",
            SnapshotField::ExecutionParallelism => "execution_parallelism",
            SnapshotField::GlobbingParallelism => "globbing_parallelism",
            SnapshotField::CpuHeavyPoolSize => "cpu_heavy_pool_size",
            SnapshotField::UsePrioritization => "use_prioritization",
        }
    }
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable parallelism settings for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ParallelismSnapshot {
    analysis_parallelism: usize,
    execution_parallelism: usize,
    globbing_parallelism: usize,
    /// Not used by the execution phase.
    cpu_heavy_pool_size: usize,
    use_prioritization: bool,
}

impl ParallelismSnapshot {
    /// Build a snapshot from plain values.
    ///
    /// A prioritized cpu-heavy lane is clamped to `analysis_parallelism`.
    pub const fn new(
        analysis_parallelism: usize,
        execution_parallelism: usize,
        globbing_parallelism: usize,
        cpu_heavy_pool_size: usize,
        use_prioritization: bool,
    ) -> Self {
        let cpu_heavy_pool_size =
            if use_prioritization && cpu_heavy_pool_size > analysis_parallelism {
                analysis_parallelism
            } else {
                cpu_heavy_pool_size
            };
        Self {
            analysis_parallelism,
            execution_parallelism,
            globbing_parallelism,
            cpu_heavy_pool_size,
            use_prioritization,
        }
    }

    /// The state before any command has refreshed the settings.
    pub const fn inert() -> Self {
        Self::new(0, 0, 0, 0, false)
    }

    /// Deterministic fixture for unit tests.
    pub const fn for_testing() -> Self {
        Self::new(6, 6, 6, 4, true)
    }

    /// Resolve a snapshot from the option groups of one command.
    pub fn resolve(
        loading: Option<&LoadingPhaseThreadsOptions>,
        build: Option<&BuildRequestOptions>,
        package: Option<&PackageOptions>,
        analysis: Option<&AnalysisOptions>,
    ) -> Self {
        let analysis_parallelism = loading.map_or(0, |o| o.threads);
        let execution_parallelism = build.map_or(0, |o| o.jobs);
        let globbing_parallelism = package.map_or(0, |o| o.globbing_threads);

        let (cpu_heavy_pool_size, use_prioritization) =
            analysis.map_or((0, false), |o| (o.cpu_heavy_pool_size, o.use_prioritization));

        Self::new(
            analysis_parallelism,
            execution_parallelism,
            globbing_parallelism,
            cpu_heavy_pool_size,
            use_prioritization,
        )
    }

    pub fn analysis_parallelism(&self) -> usize {
        self.analysis_parallelism
    }

    pub fn execution_parallelism(&self) -> usize {
        self.execution_parallelism
    }

    pub fn globbing_parallelism(&self) -> usize {
        self.globbing_parallelism
    }

    pub fn cpu_heavy_pool_size(&self) -> usize {
        self.cpu_heavy_pool_size
    }

    pub fn use_prioritization(&self) -> bool {
        self.use_prioritization
    }

    /// Value of a numeric field; `UsePrioritization` maps to 0/1.
    pub fn field(&self, field: SnapshotField) -> usize {
        match field {
            SnapshotField::AnalysisParallelism => self.analysis_parallelism,
            SnapshotField::ExecutionParallelism => self.execution_parallelism,
            SnapshotField::GlobbingParallelism => self.globbing_parallelism,
            SnapshotField::CpuHeavyPoolSize => self.cpu_heavy_pool_size,
            SnapshotField::UsePrioritization => usize::from(self.use_prioritization),
        }
    }
}

impl fmt::Display for ParallelismSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParallelismSnapshot{{analysis_parallelism={}, execution_parallelism={}, \
             globbing_parallelism={}, cpu_heavy_pool_size={}, use_prioritization={}}}",
            self.analysis_parallelism,
            self.execution_parallelism,
            self.globbing_parallelism,
            self.cpu_heavy_pool_size,
            self.use_prioritization
        )
    }
}
