//! Tokio-backed [`ExecutorBuilder`].

use super::pooled::PooledExecutor;
use phasepool_application::{BuildError, ErrorClassifier, ExecutorBuilder};
use phasepool_domain::ExecutorPlan;
use std::sync::Arc;

/// Builds [`PooledExecutor`]s on tokio runtimes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioExecutorBuilder;

impl ExecutorBuilder for TokioExecutorBuilder {
    type Executor = PooledExecutor;

    fn build(
        &self,
        plan: &ExecutorPlan,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Result<PooledExecutor, BuildError> {
        PooledExecutor::start(plan, classifier)
    }
}
