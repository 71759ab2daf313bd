//! Domain layer for phasepool
//!
//! This crate contains the parallelism snapshot, the option groups it is
//! resolved from, and the executor plans chosen for each evaluation phase.
//! It has no dependencies on threads, I/O or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Snapshot
//!
//! A [`ParallelismSnapshot`] holds five normalized values resolved once per
//! command. Absent option groups resolve to the inert zero/false state.
//!
//! ## Plans
//!
//! An [`ExecutorPlan`] is one of three topologies:
//!
//! - **Single**: one named pool
//! - **TieredPriority**: one pool, a capacity-limited CPU-heavy lane
//! - **MultiPool**: two or three named pools behind one facade

pub mod config;
pub mod executor;

// Re-export commonly used types
pub use config::{
    AnalysisOptions, BuildRequestOptions, LoadingPhaseThreadsOptions, OptionGroup, OptionGroupId,
    PackageOptions, ParallelismSnapshot, SnapshotField,
};
pub use executor::{
    error::PreconditionError,
    plan::{
        CPU_HEAVY_POOL, EXECUTION_POOL, ExecutorPlan, GENERAL_POOL, MAX_POOL_PARALLELISM, Phase,
        PoolSpec,
    },
    task::{
        ErrorClassification, QuiescenceSummary, TaskError, TaskErrorKind, TaskFailure, TaskKind,
    },
};
