//! Executor builder port
//!
//! Turns an [`ExecutorPlan`] into running pools. The factory never builds
//! pools itself; it only chooses the plan.

use super::error_classifier::ErrorClassifier;
use super::quiescing_executor::QuiescingExecutor;
use phasepool_domain::ExecutorPlan;
use std::sync::Arc;
use thiserror::Error;

/// The operating system refused to create a pool.
#[derive(Debug, Error)]
#[error("failed to start pool '{pool}': {source}")]
pub struct BuildError {
    pub pool: String,
    #[source]
    pub source: std::io::Error,
}

/// Port for constructing executors.
pub trait ExecutorBuilder {
    type Executor: QuiescingExecutor;

    /// Start the pools described by `plan`, sharing `classifier` across them.
    fn build(
        &self,
        plan: &ExecutorPlan,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Result<Self::Executor, BuildError>;
}
