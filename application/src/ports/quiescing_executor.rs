//! Quiescing executor port
//!
//! A quiescing executor accepts tasks until the caller waits for quiescence:
//! the wait blocks until every submitted task, and every task those tasks
//! submitted in turn, has finished.

use phasepool_domain::{ExecutorPlan, QuiescenceSummary, TaskError, TaskFailure, TaskKind};

/// A unit of work.
///
/// The submitter argument enqueues dependent work on the same executor.
pub type Task = Box<dyn FnOnce(&dyn TaskSubmitter) -> Result<(), TaskError> + Send + 'static>;

/// Box a closure as a [`Task`].
pub fn task<F>(f: F) -> Task
where
    F: FnOnce(&dyn TaskSubmitter) -> Result<(), TaskError> + Send + 'static,
{
    Box::new(f)
}

/// Anything tasks can be submitted to.
pub trait TaskSubmitter: Send + Sync {
    /// Enqueue a task; `kind` selects the pool or lane that runs it.
    ///
    /// After a fatal failure the executor drops new submissions.
    fn submit(&self, kind: TaskKind, task: Task);
}

/// Port for a phase executor.
///
/// Implementations (adapters) live in the infrastructure layer.
pub trait QuiescingExecutor: TaskSubmitter {
    /// Name of the executor (its general pool)
    fn name(&self) -> &str;

    /// Topology this executor was built from
    fn plan(&self) -> &ExecutorPlan;

    /// Block until all submitted and transitively enqueued work is done.
    ///
    /// Returns the first fatal failure if there was one. Must not be called
    /// from inside a task of the same executor.
    fn await_quiescence(&self) -> Result<QuiescenceSummary, TaskFailure>;
}
