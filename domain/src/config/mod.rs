//! Configuration value objects for the domain layer
//!
//! - [`option_group`]: typed option groups produced per command
//! - [`snapshot`]: the resolved [`ParallelismSnapshot`](snapshot::ParallelismSnapshot)

pub mod option_group;
pub mod snapshot;

pub use option_group::{
    AnalysisOptions, BuildRequestOptions, LoadingPhaseThreadsOptions, OptionGroup, OptionGroupId,
    PackageOptions,
};
pub use snapshot::{ParallelismSnapshot, SnapshotField};
