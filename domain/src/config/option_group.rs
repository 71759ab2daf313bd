//! Typed option groups consumed by a snapshot refresh.
//!
//! Each group is produced by the option-parsing layer of the hosting process
//! and is either present for the current command or absent altogether. An
//! absent group means the corresponding phase does not apply to the command.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier used to ask an options provider for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionGroupId {
    /// Thread count for the loading/analysis phase
    LoadingPhaseThreads,
    /// Job count of a build request (execution phase)
    BuildRequest,
    /// Package loading options (globbing threads)
    Package,
    /// Analysis options (cpu-heavy pool, prioritization)
    Analysis,
}

impl OptionGroupId {
    /// All group identifiers, in refresh order.
    pub const ALL: [OptionGroupId; 4] = [
        OptionGroupId::LoadingPhaseThreads,
        OptionGroupId::BuildRequest,
        OptionGroupId::Package,
        OptionGroupId::Analysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionGroupId::LoadingPhaseThreads => "loading_phase_threads",
            OptionGroupId::BuildRequest => "build_request",
            OptionGroupId::Package => "package",
            OptionGroupId::Analysis => "analysis",
        }
    }
}

impl fmt::Display for OptionGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `--loading_phase_threads`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingPhaseThreadsOptions {
    pub threads: usize,
}

/// Build request options relevant to executor sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequestOptions {
    pub jobs: usize,
}

/// Package loading options relevant to executor sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOptions {
    pub globbing_threads: usize,
}

/// Analysis options controlling the cpu-heavy lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Capacity reserved for CPU-heavy evaluation work (0 disables the lane)
    pub cpu_heavy_pool_size: usize,
    /// Use one prioritized pool instead of two physical pools
    pub use_prioritization: bool,
}

/// A populated option group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "group", rename_all = "snake_case")]
pub enum OptionGroup {
    LoadingPhaseThreads(LoadingPhaseThreadsOptions),
    BuildRequest(BuildRequestOptions),
    Package(PackageOptions),
    Analysis(AnalysisOptions),
}

impl OptionGroup {
    /// The identifier of this group.
    pub fn id(&self) -> OptionGroupId {
        match self {
            OptionGroup::LoadingPhaseThreads(_) => OptionGroupId::LoadingPhaseThreads,
            OptionGroup::BuildRequest(_) => OptionGroupId::BuildRequest,
            OptionGroup::Package(_) => OptionGroupId::Package,
            OptionGroup::Analysis(_) => OptionGroupId::Analysis,
        }
    }
}

impl From<LoadingPhaseThreadsOptions> for OptionGroup {
    fn from(options: LoadingPhaseThreadsOptions) -> Self {
        OptionGroup::LoadingPhaseThreads(options)
    }
}

impl From<BuildRequestOptions> for OptionGroup {
    fn from(options: BuildRequestOptions) -> Self {
        OptionGroup::BuildRequest(options)
    }
}

impl From<PackageOptions> for OptionGroup {
    fn from(options: PackageOptions) -> Self {
        OptionGroup::Package(options)
    }
}

impl From<AnalysisOptions> for OptionGroup {
    fn from(options: AnalysisOptions) -> Self {
        OptionGroup::Analysis(options)
    }
}
