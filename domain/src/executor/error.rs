//! Domain error types

use crate::config::{ParallelismSnapshot, SnapshotField};
use crate::executor::plan::Phase;
use thiserror::Error;

/// A phase executor was requested while the snapshot does not size it.
///
/// This is a programming error: either the settings were never refreshed
/// for the active command, or the command crossed a phase boundary it does
/// not support. It is never produced by a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {field} > 0 : {snapshot}")]
pub struct PreconditionError {
    pub phase: Phase,
    pub field: SnapshotField,
    pub snapshot: ParallelismSnapshot,
}

impl PreconditionError {
    /// Check that `field` is positive in `snapshot`, returning its value.
    pub fn require(
        phase: Phase,
        snapshot: &ParallelismSnapshot,
        field: SnapshotField,
    ) -> Result<usize, PreconditionError> {
        match snapshot.field(field) {
            0 => Err(PreconditionError {
                phase,
                field,
                snapshot: *snapshot,
            }),
            value => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive() {
        let snapshot = ParallelismSnapshot::new(3, 0, 0, 0, false);
        assert_eq!(
            PreconditionError::require(
                Phase::Analysis,
                &snapshot,
                SnapshotField::AnalysisParallelism
            ),
            Ok(3)
        );
    }

    #[test]
    fn test_require_zero_reports_snapshot() {
        let snapshot = ParallelismSnapshot::new(3, 0, 0, 0, false);
        let err = PreconditionError::require(
            Phase::Execution,
            &snapshot,
            SnapshotField::ExecutionParallelism,
        )
        .unwrap_err();
        assert_eq!(err.field, SnapshotField::ExecutionParallelism);
        assert_eq!(err.phase, Phase::Execution);
        let message = err.to_string();
        assert!(message.starts_with("expected execution_parallelism > 0 : "));
        assert!(message.contains("analysis_parallelism=3"));
    }
}
