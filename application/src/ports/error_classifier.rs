//! Error classifier port
//!
//! Decides whether a task failure stops the whole executor.

use phasepool_domain::{ErrorClassification, TaskError, TaskErrorKind};

/// Port for classifying task failures.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &TaskError) -> ErrorClassification;
}

/// Classification policy shared by every evaluator pool.
///
/// | Kind | Classification |
/// |------|----------------|
/// | `Evaluation` | Recoverable |
/// | `Interrupted` | Recoverable |
/// | `Panic` | Fatal |
/// | `Internal` | Fatal |
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluatorErrorClassifier;

impl ErrorClassifier for EvaluatorErrorClassifier {
    fn classify(&self, error: &TaskError) -> ErrorClassification {
        match error.kind() {
            TaskErrorKind::Evaluation | TaskErrorKind::Interrupted => {
                ErrorClassification::Recoverable
            }
            TaskErrorKind::Panic | TaskErrorKind::Internal => ErrorClassification::Fatal,
        }
    }
}
