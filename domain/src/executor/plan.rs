//! Executor plans: which pool topology a phase gets.
//!
//! Choosing a topology is a pure function of the [`ParallelismSnapshot`];
//! building the pools is left to an executor builder in the outer layers.
//!
//! ```text
//! analysis:
//!   cpu_heavy > 0 && prioritized  → TieredPriority(graph-evaluator, N, heavy lane H)
//!   cpu_heavy > 0                 → MultiPool(graph-evaluator N, graph-evaluator-cpu-heavy H)
//!   otherwise                     → Single(graph-evaluator N)
//! execution:
//!                                   Single(graph-evaluator J)
//! merged:
//!                                   MultiPool(graph-evaluator N, ...-cpu-heavy H, ...-execution J)
//! ```

use super::error::PreconditionError;
use crate::config::{ParallelismSnapshot, SnapshotField};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the general evaluation pool.
pub const GENERAL_POOL: &str = "graph-evaluator";
/// Name of the pool (or lane) reserved for CPU-heavy tasks.
pub const CPU_HEAVY_POOL: &str = "graph-evaluator-cpu-heavy";
/// Name of the execution-phase pool in a merged run.
pub const EXECUTION_POOL: &str = "graph-evaluator-execution";
/// Largest number of worker threads a single pool may be started with.
pub const MAX_POOL_PARALLELISM: usize = 4096;

/// Evaluation phase an executor is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Building the task graph
    Analysis,
    /// Running the task graph
    Execution,
    /// Analysis and execution interleaved in one evaluation
    Merged,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Analysis, Phase::Execution, Phase::Merged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Analysis => "analysis",
            Phase::Execution => "execution",
            Phase::Merged => "merged",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One physical, named worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec {
    pub name: String,
    pub parallelism: usize,
}

impl PoolSpec {
    pub fn new(name: impl Into<String>, parallelism: usize) -> Self {
        Self {
            name: name.into(),
            parallelism,
        }
    }
}

impl fmt::Display for PoolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parallelism)
    }
}

/// Pool topology for one phase executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ExecutorPlan {
    /// One named pool, no lane separation.
    Single { pool: PoolSpec },
    /// One physical pool whose CPU-heavy submissions share at most
    /// `cpu_heavy_capacity` of its threads.
    TieredPriority {
        pool: PoolSpec,
        cpu_heavy_capacity: usize,
    },
    /// Independent pools behind one facade that joins their quiescence.
    MultiPool {
        general: PoolSpec,
        cpu_heavy: PoolSpec,
        execution: Option<PoolSpec>,
    },
}

impl ExecutorPlan {
    /// Plan for the given phase.
    pub fn for_phase(
        phase: Phase,
        snapshot: &ParallelismSnapshot,
    ) -> Result<Self, PreconditionError> {
        match phase {
            Phase::Analysis => Self::for_analysis(snapshot),
            Phase::Execution => Self::for_execution(snapshot),
            Phase::Merged => Self::for_merged(snapshot),
        }
    }

    /// Plan for the analysis phase.
    pub fn for_analysis(snapshot: &ParallelismSnapshot) -> Result<Self, PreconditionError> {
        let parallelism = PreconditionError::require(
            Phase::Analysis,
            snapshot,
            SnapshotField::AnalysisParallelism,
        )?;
        let cpu_heavy = snapshot.cpu_heavy_pool_size();

        let plan = if cpu_heavy > 0 && snapshot.use_prioritization() {
            ExecutorPlan::TieredPriority {
                pool: PoolSpec::new(GENERAL_POOL, parallelism),
                cpu_heavy_capacity: cpu_heavy,
            }
        } else if cpu_heavy > 0 {
            ExecutorPlan::MultiPool {
                general: PoolSpec::new(GENERAL_POOL, parallelism),
                cpu_heavy: PoolSpec::new(CPU_HEAVY_POOL, cpu_heavy),
                execution: None,
            }
        } else {
            ExecutorPlan::Single {
                pool: PoolSpec::new(GENERAL_POOL, parallelism),
            }
        };
        Ok(plan)
    }

    /// Plan for the execution phase.
    pub fn for_execution(snapshot: &ParallelismSnapshot) -> Result<Self, PreconditionError> {
        let parallelism = PreconditionError::require(
            Phase::Execution,
            snapshot,
            SnapshotField::ExecutionParallelism,
        )?;
        Ok(ExecutorPlan::Single {
            pool: PoolSpec::new(GENERAL_POOL, parallelism),
        })
    }

    /// Plan for a merged analysis and execution run.
    ///
    /// Prioritization within a single pool is not offered here.
    pub fn for_merged(snapshot: &ParallelismSnapshot) -> Result<Self, PreconditionError> {
        let require = |field| PreconditionError::require(Phase::Merged, snapshot, field);
        let analysis = require(SnapshotField::AnalysisParallelism)?;
        let execution = require(SnapshotField::ExecutionParallelism)?;
        let cpu_heavy = require(SnapshotField::CpuHeavyPoolSize)?;

        Ok(ExecutorPlan::MultiPool {
            general: PoolSpec::new(GENERAL_POOL, analysis),
            cpu_heavy: PoolSpec::new(CPU_HEAVY_POOL, cpu_heavy),
            execution: Some(PoolSpec::new(EXECUTION_POOL, execution)),
        })
    }

    /// Short strategy label for logs and output.
    pub fn strategy(&self) -> &'static str {
        match self {
            ExecutorPlan::Single { .. } => "single",
            ExecutorPlan::TieredPriority { .. } => "tiered_priority",
            ExecutorPlan::MultiPool { .. } => "multi_pool",
        }
    }

    /// Name of the executor as a whole (its general pool).
    pub fn name(&self) -> &str {
        match self {
            ExecutorPlan::Single { pool } | ExecutorPlan::TieredPriority { pool, .. } => {
                &pool.name
            }
            ExecutorPlan::MultiPool { general, .. } => &general.name,
        }
    }

    /// Physical pools this plan creates, general pool first.
    pub fn pools(&self) -> Vec<&PoolSpec> {
        match self {
            ExecutorPlan::Single { pool } | ExecutorPlan::TieredPriority { pool, .. } => {
                vec![pool]
            }
            ExecutorPlan::MultiPool {
                general,
                cpu_heavy,
                execution,
            } => {
                let mut pools = vec![general, cpu_heavy];
                pools.extend(execution.as_ref());
                pools
            }
        }
    }

    /// Worker threads created by this plan.
    pub fn total_threads(&self) -> usize {
        self.pools().iter().map(|p| p.parallelism).sum()
    }
}

impl fmt::Display for ExecutorPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorPlan::Single { pool } => write!(f, "single {}", pool),
            ExecutorPlan::TieredPriority {
                pool,
                cpu_heavy_capacity,
            } => write!(
                f,
                "tiered_priority {} heavy_lane={}",
                pool, cpu_heavy_capacity
            ),
            ExecutorPlan::MultiPool { .. } => {
                let pools: Vec<String> = self.pools().iter().map(|p| p.to_string()).collect();
                write!(f, "multi_pool [{}]", pools.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(plan: &ExecutorPlan) -> Vec<usize> {
        plan.pools().iter().map(|p| p.parallelism).collect()
    }

    #[test]
    fn test_analysis_tiered_when_prioritized() {
        let snapshot = ParallelismSnapshot::new(8, 0, 0, 5, true);
        let plan = ExecutorPlan::for_analysis(&snapshot).unwrap();
        assert_eq!(
            plan,
            ExecutorPlan::TieredPriority {
                pool: PoolSpec::new(GENERAL_POOL, 8),
                cpu_heavy_capacity: 5,
            }
        );
        assert_eq!(plan.total_threads(), 8);
    }

    #[test]
    fn test_analysis_dual_pool_without_prioritization() {
        let snapshot = ParallelismSnapshot::new(8, 0, 0, 5, false);
        let plan = ExecutorPlan::for_analysis(&snapshot).unwrap();
        assert_eq!(
            plan,
            ExecutorPlan::MultiPool {
                general: PoolSpec::new(GENERAL_POOL, 8),
                cpu_heavy: PoolSpec::new(CPU_HEAVY_POOL, 5),
                execution: None,
            }
        );
        assert_eq!(sizes(&plan), vec![8, 5]);
    }

    #[test]
    fn test_analysis_single_without_cpu_heavy() {
        for prioritized in [true, false] {
            let snapshot = ParallelismSnapshot::new(8, 0, 0, 0, prioritized);
            let plan = ExecutorPlan::for_analysis(&snapshot).unwrap();
            assert_eq!(
                plan,
                ExecutorPlan::Single {
                    pool: PoolSpec::new(GENERAL_POOL, 8)
                }
            );
        }
    }

    #[test]
    fn test_analysis_requires_parallelism() {
        let snapshot = ParallelismSnapshot::new(0, 4, 0, 5, true);
        let err = ExecutorPlan::for_analysis(&snapshot).unwrap_err();
        assert_eq!(err.field, SnapshotField::AnalysisParallelism);
    }

    #[test]
    fn test_execution_single_pool() {
        let snapshot = ParallelismSnapshot::new(0, 4, 0, 3, true);
        let plan = ExecutorPlan::for_execution(&snapshot).unwrap();
        assert_eq!(plan.strategy(), "single");
        assert_eq!(sizes(&plan), vec![4]);
    }

    #[test]
    fn test_execution_requires_jobs() {
        let snapshot = ParallelismSnapshot::new(8, 0, 0, 0, false);
        let err = ExecutorPlan::for_execution(&snapshot).unwrap_err();
        assert_eq!(err.field, SnapshotField::ExecutionParallelism);
    }

    #[test]
    fn test_merged_three_pools() {
        let snapshot = ParallelismSnapshot::new(8, 4, 2, 8, true);
        let plan = ExecutorPlan::for_merged(&snapshot).unwrap();
        let names: Vec<&str> = plan.pools().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec![GENERAL_POOL, CPU_HEAVY_POOL, EXECUTION_POOL]);
        assert_eq!(sizes(&plan), vec![8, 8, 4]);
        assert_eq!(plan.total_threads(), 20);
    }

    #[test]
    fn test_merged_checks_fields_in_order() {
        let cases = [
            (
                ParallelismSnapshot::new(0, 0, 0, 0, false),
                SnapshotField::AnalysisParallelism,
            ),
            (
                ParallelismSnapshot::new(8, 0, 0, 0, false),
                SnapshotField::ExecutionParallelism,
            ),
            (
                ParallelismSnapshot::new(8, 4, 0, 0, false),
                SnapshotField::CpuHeavyPoolSize,
            ),
        ];
        for (snapshot, field) in cases {
            let err = ExecutorPlan::for_merged(&snapshot).unwrap_err();
            assert_eq!(err.field, field);
            assert_eq!(err.phase, Phase::Merged);
        }
    }

    #[test]
    fn test_for_phase_dispatch() {
        let snapshot = ParallelismSnapshot::for_testing();
        assert_eq!(
            ExecutorPlan::for_phase(Phase::Analysis, &snapshot).unwrap(),
            ExecutorPlan::for_analysis(&snapshot).unwrap()
        );
        assert_eq!(
            ExecutorPlan::for_phase(Phase::Merged, &snapshot)
                .unwrap()
                .strategy(),
            "multi_pool"
        );
    }

    #[test]
    fn test_display() {
        let plan = ExecutorPlan::for_analysis(&ParallelismSnapshot::for_testing()).unwrap();
        assert_eq!(
            plan.to_string(),
            "tiered_priority graph-evaluator(6) heavy_lane=4"
        );
        let merged = ExecutorPlan::for_merged(&ParallelismSnapshot::for_testing()).unwrap();
        assert_eq!(
            merged.to_string(),
            "multi_pool [graph-evaluator(6), graph-evaluator-cpu-heavy(4), graph-evaluator-execution(6)]"
        );
    }
}
