//! Synthetic workload for `phasepool run`

use phasepool_application::{Task, TaskSubmitter, task};
use phasepool_domain::{Phase, TaskError, TaskKind};
use std::hint::black_box;

/// Root tasks plus their children, shaped by the `run` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    pub tasks: usize,
    /// Every n-th root task is CPU-heavy (0 = none)
    pub heavy_every: usize,
    /// Children each root task enqueues
    pub fan_out: usize,
    /// Root task that fails fatally
    pub fail_at: Option<usize>,
    pub child_kind: TaskKind,
}

impl Workload {
    pub fn new(phase: Phase, tasks: usize) -> Self {
        let child_kind = match phase {
            Phase::Merged => TaskKind::Execution,
            Phase::Analysis | Phase::Execution => TaskKind::Default,
        };
        Self {
            tasks,
            heavy_every: 0,
            fan_out: 0,
            fail_at: None,
            child_kind,
        }
    }

    pub fn with_heavy_every(mut self, heavy_every: usize) -> Self {
        self.heavy_every = heavy_every;
        self
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_fail_at(mut self, fail_at: Option<usize>) -> Self {
        self.fail_at = fail_at;
        self
    }

    /// Tasks that run when nothing fails.
    pub fn expected_tasks(&self) -> usize {
        self.tasks.saturating_mul(self.fan_out.saturating_add(1))
    }

    fn kind_of(&self, index: usize) -> TaskKind {
        if self.heavy_every > 0 && (index + 1) % self.heavy_every == 0 {
            TaskKind::CpuHeavy
        } else {
            TaskKind::Default
        }
    }

    pub fn submit_to(&self, submitter: &dyn TaskSubmitter) {
        for index in 0..self.tasks {
            let kind = self.kind_of(index);
            submitter.submit(kind, self.root(index, kind));
        }
    }

    fn root(&self, index: usize, kind: TaskKind) -> Task {
        let workload = *self;
        task(move |submitter| {
            if workload.fail_at == Some(index) {
                return Err(TaskError::internal(format!(
                    "synthetic failure in task {}",
                    index
                )));
            }
            let rounds = match kind {
                TaskKind::CpuHeavy => 200_000,
                TaskKind::Default | TaskKind::Execution => 20_000,
            };
            spin(index as u64, rounds);
            for child in 0..workload.fan_out {
                let seed = index.wrapping_mul(workload.fan_out).wrapping_add(child) as u64;
                submitter.submit(
                    workload.child_kind,
                    task(move |_| {
                        spin(seed, 10_000);
                        Ok(())
                    }),
                );
            }
            Ok(())
        })
    }
}

fn spin(seed: u64, rounds: u32) -> u64 {
    let mut x = seed | 1;
    for _ in 0..rounds {
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
    }
    black_box(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasepool_application::{EvaluatorErrorClassifier, QuiescingExecutor};
    use phasepool_domain::{ExecutorPlan, ParallelismSnapshot};
    use phasepool_infrastructure::PooledExecutor;
    use std::sync::Arc;

    fn executor(phase: Phase) -> PooledExecutor {
        let plan = ExecutorPlan::for_phase(phase, &ParallelismSnapshot::new(2, 2, 1, 1, false))
            .unwrap();
        PooledExecutor::start(&plan, Arc::new(EvaluatorErrorClassifier)).unwrap()
    }

    #[test]
    fn test_heavy_every_selects_kinds() {
        let workload = Workload::new(Phase::Analysis, 6).with_heavy_every(3);
        let kinds: Vec<_> = (0..6).map(|i| workload.kind_of(i)).collect();
        assert_eq!(
            kinds,
            vec![
                TaskKind::Default,
                TaskKind::Default,
                TaskKind::CpuHeavy,
                TaskKind::Default,
                TaskKind::Default,
                TaskKind::CpuHeavy,
            ]
        );
        assert_eq!(Workload::new(Phase::Analysis, 3).kind_of(2), TaskKind::Default);
    }

    #[test]
    fn test_expected_tasks_saturates() {
        let workload = Workload::new(Phase::Analysis, usize::MAX).with_fan_out(usize::MAX);
        assert_eq!(workload.expected_tasks(), usize::MAX);
        assert_eq!(
            Workload::new(Phase::Analysis, 10).with_fan_out(3).expected_tasks(),
            40
        );
    }

    #[test]
    fn test_merged_children_run_as_execution() {
        assert_eq!(Workload::new(Phase::Merged, 1).child_kind, TaskKind::Execution);
        assert_eq!(Workload::new(Phase::Execution, 1).child_kind, TaskKind::Default);
    }

    #[test]
    fn test_workload_runs_to_quiescence() {
        let workload = Workload::new(Phase::Merged, 10)
            .with_heavy_every(2)
            .with_fan_out(3);
        let executor = executor(Phase::Merged);
        workload.submit_to(&executor);

        let summary = executor.await_quiescence().unwrap();
        assert_eq!(summary.completed, workload.expected_tasks());
        assert_eq!(summary.completed, 40);
    }

    #[test]
    fn test_fail_at_stops_the_run() {
        let workload = Workload::new(Phase::Analysis, 20).with_fail_at(Some(0));
        let executor = executor(Phase::Analysis);
        workload.submit_to(&executor);

        let failure = executor.await_quiescence().unwrap_err();
        assert_eq!(failure.error.message(), "synthetic failure in task 0");
    }
}
