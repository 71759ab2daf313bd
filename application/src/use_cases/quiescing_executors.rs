//! Quiescing executors use case.
//!
//! [`QuiescingExecutors`] is what the evaluation engine talks to: it is
//! refreshed at the start of each command and later asked for the executor of
//! each phase. Choosing the topology is delegated to [`ExecutorPlan`], building
//! it to an [`ExecutorBuilder`] adapter.
//!
//! ```text
//! refresh(options) ──► ParallelismSettings (versioned swap)
//!
//! analysis_executor() ─┐
//! execution_executor() ├─► ExecutorPlan::for_*(snapshot) ──► ExecutorBuilder::build(plan)
//! merged_..._executor()┘        │
//!                               └─ PreconditionError (builder never called)
//! ```

use crate::config::ParallelismSettings;
use crate::ports::error_classifier::{ErrorClassifier, EvaluatorErrorClassifier};
use crate::ports::executor_builder::{BuildError, ExecutorBuilder};
use crate::ports::options_provider::OptionsProvider;
use phasepool_domain::{ExecutorPlan, ParallelismSnapshot, Phase, PreconditionError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Errors from the executor factory operations.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The snapshot does not size the requested phase. Unrecoverable.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl ExecutorError {
    /// Check if this error is a misuse of the factory rather than an OS failure
    pub fn is_precondition(&self) -> bool {
        matches!(self, ExecutorError::Precondition(_))
    }
}

/// Per-process factory of phase executors.
pub struct QuiescingExecutors<B: ExecutorBuilder> {
    settings: ParallelismSettings,
    builder: B,
    classifier: Arc<dyn ErrorClassifier>,
}

impl<B: ExecutorBuilder> QuiescingExecutors<B> {
    /// Factory with inert settings; call [`refresh`](Self::refresh) before use.
    pub fn new(builder: B) -> Self {
        Self::with_settings(builder, ParallelismSettings::default())
    }

    /// Factory with the fixed test snapshot, bypassing any options lookup.
    pub fn for_testing(builder: B) -> Self {
        Self::with_settings(builder, ParallelismSettings::for_testing())
    }

    pub fn with_settings(builder: B, settings: ParallelismSettings) -> Self {
        Self {
            settings,
            builder,
            classifier: Arc::new(EvaluatorErrorClassifier),
        }
    }

    /// Replace the classifier shared by every executor built from now on.
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    // ==================== Snapshot ====================

    /// Refresh the settings from the options of a new command.
    pub fn refresh(&self, options: &dyn OptionsProvider) -> Arc<ParallelismSnapshot> {
        self.settings.refresh(options)
    }

    pub fn settings(&self) -> &ParallelismSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> Arc<ParallelismSnapshot> {
        self.settings.current()
    }

    pub fn analysis_parallelism(&self) -> usize {
        self.snapshot().analysis_parallelism()
    }

    pub fn execution_parallelism(&self) -> usize {
        self.snapshot().execution_parallelism()
    }

    pub fn globbing_parallelism(&self) -> usize {
        self.snapshot().globbing_parallelism()
    }

    pub fn cpu_heavy_pool_size(&self) -> usize {
        self.snapshot().cpu_heavy_pool_size()
    }

    pub fn use_prioritization_for_analysis(&self) -> bool {
        self.snapshot().use_prioritization()
    }

    // ==================== Executors ====================

    /// Plan the given phase would be built from, without building it.
    pub fn plan_for(&self, phase: Phase) -> Result<ExecutorPlan, PreconditionError> {
        ExecutorPlan::for_phase(phase, &self.snapshot())
    }

    pub fn analysis_executor(&self) -> Result<B::Executor, ExecutorError> {
        self.executor_for(Phase::Analysis)
    }

    pub fn execution_executor(&self) -> Result<B::Executor, ExecutorError> {
        self.executor_for(Phase::Execution)
    }

    pub fn merged_analysis_and_execution_executor(&self) -> Result<B::Executor, ExecutorError> {
        self.executor_for(Phase::Merged)
    }

    /// Build the executor for `phase` from the current snapshot.
    pub fn executor_for(&self, phase: Phase) -> Result<B::Executor, ExecutorError> {
        let plan = self.plan_for(phase).inspect_err(|e| {
            error!("Refusing to build {} executor: {}", phase, e);
        })?;

        debug!(
            "Building {} executor: {} ({} threads)",
            phase,
            plan,
            plan.total_threads()
        );
        let executor = self.builder.build(&plan, Arc::clone(&self.classifier))?;
        Ok(executor)
    }
}
