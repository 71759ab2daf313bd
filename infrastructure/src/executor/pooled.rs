//! Pooled executor, the concrete implementation of [`QuiescingExecutor`].
//!
//! [`PooledExecutor`] runs every [`ExecutorPlan`] topology on top of one or
//! more [`NamedPool`]s. The topologies differ only in how a [`TaskKind`] is
//! routed to a lane:
//!
//! ```text
//! Single          Default ─┐
//!                 CpuHeavy ├──► graph-evaluator
//!                 Execution┘
//!
//! TieredPriority  Default ───────────────────► graph-evaluator
//!                 CpuHeavy ──► [heavy permits] ─┘
//!
//! MultiPool       Default ───► graph-evaluator
//!                 CpuHeavy ──► graph-evaluator-cpu-heavy
//!                 Execution ─► graph-evaluator-execution (general pool if absent)
//! ```
//!
//! All lanes share one quiescence tracker, one error classifier and one
//! cancellation token, so the executor quiesces and fails as a unit.
//!
//! # Fail-fast
//!
//! The first fatal failure cancels the token. Tasks still queued are skipped
//! when dequeued, tasks waiting for a heavy permit stop waiting, and new
//! submissions are dropped.

use super::named_pool::NamedPool;
use super::quiescence::{Outcome, QuiescenceTracker};
use phasepool_application::{
    BuildError, ErrorClassifier, QuiescingExecutor, Task, TaskSubmitter,
};
use phasepool_domain::{
    ErrorClassification, ExecutorPlan, QuiescenceSummary, TaskError, TaskFailure, TaskKind,
};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Where tasks of one kind run.
#[derive(Clone)]
struct Lane {
    pool: String,
    handle: Handle,
    /// Concurrency cap within a shared pool (tiered heavy lane)
    permits: Option<Arc<Semaphore>>,
}

impl Lane {
    fn new(pool: &NamedPool) -> Result<Self, BuildError> {
        let handle = pool.handle().ok_or_else(|| BuildError {
            pool: pool.name().to_string(),
            source: io::Error::other("pool is shut down"),
        })?;
        Ok(Self {
            pool: pool.name().to_string(),
            handle,
            permits: None,
        })
    }

    fn limited(mut self, capacity: usize) -> Self {
        self.permits = Some(Arc::new(Semaphore::new(capacity)));
        self
    }
}

struct Lanes {
    general: Lane,
    cpu_heavy: Option<Lane>,
    execution: Option<Lane>,
}

impl Lanes {
    fn route(&self, kind: TaskKind) -> &Lane {
        let lane = match kind {
            TaskKind::Default => None,
            TaskKind::CpuHeavy => self.cpu_heavy.as_ref(),
            TaskKind::Execution => self.execution.as_ref(),
        };
        lane.unwrap_or(&self.general)
    }
}

struct Shared {
    lanes: Lanes,
    tracker: QuiescenceTracker,
    classifier: Arc<dyn ErrorClassifier>,
    cancel: CancellationToken,
}

/// Cloneable submission handle given to running tasks.
#[derive(Clone)]
struct Submitter {
    shared: Arc<Shared>,
}

impl TaskSubmitter for Submitter {
    fn submit(&self, kind: TaskKind, task: Task) {
        let shared = &self.shared;
        if shared.cancel.is_cancelled() {
            trace!("Dropping {} task submitted after a fatal failure", kind);
            shared.tracker.reject();
            return;
        }

        shared.tracker.enqueue();
        let lane = shared.lanes.route(kind);
        let permits = lane.permits.clone();
        let submitter = self.clone();

        lane.handle.spawn(async move {
            let _permit = match permits {
                Some(semaphore) => tokio::select! {
                    permit = semaphore.acquire_owned() => permit.ok(),
                    _ = submitter.shared.cancel.cancelled() => None,
                },
                None => None,
            };
            submitter.run(kind, task);
        });
    }
}

impl Submitter {
    fn run(&self, kind: TaskKind, task: Task) {
        let shared = &self.shared;
        if shared.cancel.is_cancelled() {
            shared.tracker.finish(Outcome::Skipped);
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| task(self)))
            .unwrap_or_else(|payload| Err(TaskError::panic(panic_message(payload.as_ref()))));

        let outcome = match result {
            Ok(()) => Outcome::Completed,
            Err(task_error) => {
                let failure = TaskFailure::new(&shared.lanes.route(kind).pool, task_error);
                match shared.classifier.classify(&failure.error) {
                    ErrorClassification::Recoverable => {
                        debug!("Recoverable {} task failure: {}", kind, failure);
                        Outcome::Recoverable(failure)
                    }
                    ErrorClassification::Fatal => {
                        error!("Fatal {} task failure, stopping executor: {}", kind, failure);
                        shared.cancel.cancel();
                        Outcome::Fatal(failure)
                    }
                }
            }
        };
        shared.tracker.finish(outcome);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Quiescing executor over one or more named pools.
pub struct PooledExecutor {
    plan: ExecutorPlan,
    submitter: Submitter,
    // Dropped last: shutting the pools down releases queued tasks
    pools: Vec<NamedPool>,
}

impl PooledExecutor {
    /// Start the pools of `plan` and wire their lanes.
    ///
    /// If any pool fails to start, the pools already started are shut down.
    pub fn start(
        plan: &ExecutorPlan,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Result<Self, BuildError> {
        let (lanes, pools) = match plan {
            ExecutorPlan::Single { pool } => {
                let pool = NamedPool::start(pool)?;
                let lanes = Lanes {
                    general: Lane::new(&pool)?,
                    cpu_heavy: None,
                    execution: None,
                };
                (lanes, vec![pool])
            }
            ExecutorPlan::TieredPriority {
                pool,
                cpu_heavy_capacity,
            } => {
                if *cpu_heavy_capacity == 0 {
                    return Err(BuildError {
                        pool: pool.name.clone(),
                        source: io::Error::new(
                            io::ErrorKind::InvalidInput,
                            "cpu-heavy lane capacity must be > 0",
                        ),
                    });
                }
                let pool = NamedPool::start(pool)?;
                let general = Lane::new(&pool)?;
                let lanes = Lanes {
                    cpu_heavy: Some(general.clone().limited(*cpu_heavy_capacity)),
                    general,
                    execution: None,
                };
                (lanes, vec![pool])
            }
            ExecutorPlan::MultiPool {
                general,
                cpu_heavy,
                execution,
            } => {
                let general = NamedPool::start(general)?;
                let cpu_heavy = NamedPool::start(cpu_heavy)?;
                let execution = execution.as_ref().map(NamedPool::start).transpose()?;
                let lanes = Lanes {
                    general: Lane::new(&general)?,
                    cpu_heavy: Some(Lane::new(&cpu_heavy)?),
                    execution: execution.as_ref().map(Lane::new).transpose()?,
                };
                let mut pools = vec![general, cpu_heavy];
                pools.extend(execution);
                (lanes, pools)
            }
        };

        info!(
            "Started {} executor '{}' with {} threads",
            plan.strategy(),
            plan.name(),
            plan.total_threads()
        );
        Ok(Self {
            plan: plan.clone(),
            submitter: Submitter {
                shared: Arc::new(Shared {
                    lanes,
                    tracker: QuiescenceTracker::default(),
                    classifier,
                    cancel: CancellationToken::new(),
                }),
            },
            pools,
        })
    }

    /// Names of the physical pools, general pool first.
    pub fn pool_names(&self) -> Vec<&str> {
        self.pools.iter().map(NamedPool::name).collect()
    }

    /// Tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.submitter.shared.tracker.in_flight()
    }

    /// Whether a fatal failure has stopped this executor.
    pub fn is_cancelled(&self) -> bool {
        self.submitter.shared.cancel.is_cancelled()
    }
}

impl TaskSubmitter for PooledExecutor {
    fn submit(&self, kind: TaskKind, task: Task) {
        self.submitter.submit(kind, task);
    }
}

impl QuiescingExecutor for PooledExecutor {
    fn name(&self) -> &str {
        self.plan.name()
    }

    fn plan(&self) -> &ExecutorPlan {
        &self.plan
    }

    fn await_quiescence(&self) -> Result<QuiescenceSummary, TaskFailure> {
        let result = self.submitter.shared.tracker.wait();
        match &result {
            Ok(summary) => debug!(
                "Executor '{}' quiescent: {} completed, {} recoverable failures",
                self.name(),
                summary.completed,
                summary.recoverable_failures.len()
            ),
            Err(failure) => debug!("Executor '{}' stopped: {}", self.name(), failure),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasepool_application::{EvaluatorErrorClassifier, task};
    use phasepool_domain::{
        CPU_HEAVY_POOL, EXECUTION_POOL, GENERAL_POOL, ParallelismSnapshot, PoolSpec,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, mpsc};
    use std::thread;
    use std::time::{Duration, Instant};

    fn start(plan: ExecutorPlan) -> PooledExecutor {
        PooledExecutor::start(&plan, Arc::new(EvaluatorErrorClassifier)).unwrap()
    }

    fn single(parallelism: usize) -> PooledExecutor {
        start(ExecutorPlan::Single {
            pool: PoolSpec::new(GENERAL_POOL, parallelism),
        })
    }

    fn thread_name() -> String {
        thread::current().name().unwrap_or_default().to_string()
    }

    /// Tracks the highest number of concurrently running task bodies.
    #[derive(Default)]
    struct Concurrency {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Concurrency {
        fn enter(&self) {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.running.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_single_pool_runs_every_task() {
        let executor = single(3);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            executor.submit(
                TaskKind::Default,
                task(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }

        let summary = executor.await_quiescence().unwrap();
        assert_eq!(summary.completed, 50);
        assert_eq!(counter.load(Ordering::SeqCst), 50);
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn test_quiescence_with_no_tasks() {
        let executor = single(1);
        assert_eq!(
            executor.await_quiescence().unwrap(),
            QuiescenceSummary::default()
        );
    }

    fn fan_out(depth: usize, width: usize) -> Task {
        task(move |submitter| {
            if depth > 0 {
                for _ in 0..width {
                    submitter.submit(TaskKind::Default, fan_out(depth - 1, width));
                }
            }
            Ok(())
        })
    }

    #[test]
    fn test_quiescence_waits_for_transitive_work() {
        let executor = single(2);
        executor.submit(TaskKind::Default, fan_out(3, 3));
        let summary = executor.await_quiescence().unwrap();
        // 1 + 3 + 9 + 27
        assert_eq!(summary.completed, 40);
    }

    #[test]
    fn test_pool_parallelism_bounds_concurrency() {
        let executor = single(2);
        let concurrency = Arc::new(Concurrency::default());
        for _ in 0..8 {
            let concurrency = Arc::clone(&concurrency);
            executor.submit(
                TaskKind::Default,
                task(move |_| {
                    concurrency.enter();
                    thread::sleep(Duration::from_millis(10));
                    concurrency.exit();
                    Ok(())
                }),
            );
        }
        executor.await_quiescence().unwrap();
        assert!(concurrency.peak() <= 2);
    }

    #[test]
    fn test_recoverable_failure_does_not_stop_executor() {
        let executor = single(2);
        executor.submit(
            TaskKind::Default,
            task(|_| Err(TaskError::evaluation("missing input"))),
        );
        for _ in 0..5 {
            executor.submit(TaskKind::Default, task(|_| Ok(())));
        }

        let summary = executor.await_quiescence().unwrap();
        assert_eq!(summary.completed, 5);
        assert_eq!(summary.recoverable_failures.len(), 1);
        assert_eq!(summary.recoverable_failures[0].pool, GENERAL_POOL);
        assert!(!executor.is_cancelled());
    }

    #[test]
    fn test_fatal_failure_fails_fast() {
        let executor = single(1);
        executor.submit(
            TaskKind::Default,
            task(|_| Err(TaskError::internal("inconsistent graph"))),
        );
        for _ in 0..20 {
            executor.submit(
                TaskKind::Default,
                task(|_| {
                    thread::sleep(Duration::from_millis(5));
                    Ok(())
                }),
            );
        }

        let failure = executor.await_quiescence().unwrap_err();
        assert_eq!(failure.pool, GENERAL_POOL);
        assert_eq!(failure.error.message(), "inconsistent graph");
        assert!(executor.is_cancelled());

        // Later submissions are dropped and the failure stays reported
        let ran = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&ran);
        executor.submit(
            TaskKind::Default,
            task(move |_| {
                flag.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );
        assert!(executor.await_quiescence().is_err());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    fn counting(ran: &Arc<AtomicUsize>) -> Task {
        let ran = Arc::clone(ran);
        task(move |_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_queued_tasks_are_skipped_after_fatal_failure() {
        let executor = single(1);
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        executor.submit(
            TaskKind::Default,
            task(move |_| {
                started_tx.send(()).unwrap();
                gate_rx.recv().unwrap();
                Err(TaskError::internal("inconsistent graph"))
            }),
        );

        // The only worker is busy, so these stay queued
        started_rx.recv().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            executor.submit(TaskKind::Default, counting(&ran));
        }
        assert_eq!(executor.in_flight(), 11);
        gate_tx.send(()).unwrap();

        let failure = executor.await_quiescence().unwrap_err();
        assert_eq!(failure.error.message(), "inconsistent graph");
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn test_heavy_lane_waiters_stop_on_fatal_failure() {
        let executor = start(ExecutorPlan::TieredPriority {
            pool: PoolSpec::new(GENERAL_POOL, 2),
            cpu_heavy_capacity: 1,
        });
        let (started_tx, started_rx) = mpsc::channel();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        executor.submit(
            TaskKind::CpuHeavy,
            task(move |_| {
                started_tx.send(()).unwrap();
                gate_rx.recv().unwrap();
                Ok(())
            }),
        );

        // Holds the only heavy permit until the gate opens
        started_rx.recv().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            executor.submit(TaskKind::CpuHeavy, counting(&ran));
        }
        executor.submit(
            TaskKind::Default,
            task(|_| Err(TaskError::internal("lane failure"))),
        );

        // Waiters leave while the permit is still held
        let deadline = Instant::now() + Duration::from_secs(5);
        while executor.in_flight() > 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(executor.in_flight(), 1);
        assert!(executor.is_cancelled());

        gate_tx.send(()).unwrap();
        let failure = executor.await_quiescence().unwrap_err();
        assert_eq!(failure.error.message(), "lane failure");
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(executor.in_flight(), 0);
    }

    #[test]
    fn test_panic_is_fatal() {
        let executor = single(2);
        executor.submit(TaskKind::Default, task(|_| panic!("boom")));
        let failure = executor.await_quiescence().unwrap_err();
        assert_eq!(failure.error.kind(), phasepool_domain::TaskErrorKind::Panic);
        assert_eq!(failure.error.message(), "boom");
    }

    #[test]
    fn test_tiered_heavy_lane_is_capped() {
        let executor = start(ExecutorPlan::TieredPriority {
            pool: PoolSpec::new(GENERAL_POOL, 4),
            cpu_heavy_capacity: 2,
        });
        assert_eq!(executor.pool_names(), vec![GENERAL_POOL]);

        let heavy = Arc::new(Concurrency::default());
        let names = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..8 {
            let heavy = Arc::clone(&heavy);
            let names = Arc::clone(&names);
            executor.submit(
                TaskKind::CpuHeavy,
                task(move |_| {
                    heavy.enter();
                    names.lock().unwrap().push(thread_name());
                    thread::sleep(Duration::from_millis(10));
                    heavy.exit();
                    Ok(())
                }),
            );
        }
        let light = Arc::new(AtomicUsize::new(0));
        for _ in 0..4 {
            let light = Arc::clone(&light);
            executor.submit(
                TaskKind::Default,
                task(move |_| {
                    light.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }

        let summary = executor.await_quiescence().unwrap();
        assert_eq!(summary.completed, 12);
        assert_eq!(light.load(Ordering::SeqCst), 4);
        assert!(heavy.peak() <= 2);
        for name in names.lock().unwrap().iter() {
            assert!(name.starts_with("graph-evaluator-"));
            assert!(!name.contains("cpu-heavy"));
        }
    }

    #[test]
    fn test_dual_pool_routes_heavy_tasks() {
        let executor = start(ExecutorPlan::MultiPool {
            general: PoolSpec::new(GENERAL_POOL, 2),
            cpu_heavy: PoolSpec::new(CPU_HEAVY_POOL, 1),
            execution: None,
        });
        assert_eq!(executor.pool_names(), vec![GENERAL_POOL, CPU_HEAVY_POOL]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [TaskKind::Default, TaskKind::CpuHeavy, TaskKind::Execution] {
            let seen = Arc::clone(&seen);
            executor.submit(
                kind,
                task(move |_| {
                    seen.lock().unwrap().push((kind, thread_name()));
                    Ok(())
                }),
            );
        }
        executor.await_quiescence().unwrap();

        for (kind, name) in seen.lock().unwrap().iter() {
            match kind {
                TaskKind::CpuHeavy => assert!(name.starts_with("graph-evaluator-cpu-heavy-")),
                // No execution pool: execution work shares the general pool
                TaskKind::Default | TaskKind::Execution => {
                    assert!(name.starts_with("graph-evaluator-"));
                    assert!(!name.contains("cpu-heavy"));
                }
            }
        }
    }

    #[test]
    fn test_merged_pools_join_quiescence() {
        let plan = ExecutorPlan::for_merged(&ParallelismSnapshot::new(2, 2, 1, 1, true)).unwrap();
        let executor = start(plan);
        assert_eq!(
            executor.pool_names(),
            vec![GENERAL_POOL, CPU_HEAVY_POOL, EXECUTION_POOL]
        );

        let execution_threads = Arc::new(Mutex::new(Vec::new()));
        let threads = Arc::clone(&execution_threads);
        // Analysis work enqueues execution work on another pool
        executor.submit(
            TaskKind::Default,
            task(move |submitter| {
                for _ in 0..3 {
                    let threads = Arc::clone(&threads);
                    submitter.submit(
                        TaskKind::Execution,
                        task(move |_| {
                            thread::sleep(Duration::from_millis(5));
                            threads.lock().unwrap().push(thread_name());
                            Ok(())
                        }),
                    );
                }
                Ok(())
            }),
        );

        let summary = executor.await_quiescence().unwrap();
        assert_eq!(summary.completed, 4);
        let names = execution_threads.lock().unwrap();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| n.starts_with("graph-evaluator-execution-")));
    }

    #[test]
    fn test_failure_in_heavy_pool_is_attributed() {
        let executor = start(ExecutorPlan::MultiPool {
            general: PoolSpec::new(GENERAL_POOL, 1),
            cpu_heavy: PoolSpec::new(CPU_HEAVY_POOL, 1),
            execution: None,
        });
        executor.submit(
            TaskKind::CpuHeavy,
            task(|_| Err(TaskError::internal("heavy failure"))),
        );
        let failure = executor.await_quiescence().unwrap_err();
        assert_eq!(failure.pool, CPU_HEAVY_POOL);
    }

    #[test]
    fn test_start_rejects_empty_pool() {
        let plan = ExecutorPlan::MultiPool {
            general: PoolSpec::new(GENERAL_POOL, 1),
            cpu_heavy: PoolSpec::new(CPU_HEAVY_POOL, 0),
            execution: None,
        };
        let err = PooledExecutor::start(&plan, Arc::new(EvaluatorErrorClassifier))
            .err()
            .unwrap();
        assert_eq!(err.pool, CPU_HEAVY_POOL);
    }
}
