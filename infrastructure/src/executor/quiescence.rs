//! In-flight task accounting shared by every pool of one executor.

use phasepool_domain::{QuiescenceSummary, TaskFailure};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// How a task left the executor.
#[derive(Debug)]
pub(crate) enum Outcome {
    Completed,
    Recoverable(TaskFailure),
    Fatal(TaskFailure),
    /// Dequeued after a fatal failure and never run
    Skipped,
}

#[derive(Debug, Default)]
struct State {
    in_flight: usize,
    summary: QuiescenceSummary,
    fatal: Option<TaskFailure>,
}

/// Counts in-flight tasks and wakes waiters when the count drops to zero.
#[derive(Debug, Default)]
pub(crate) struct QuiescenceTracker {
    state: Mutex<State>,
    quiet: Condvar,
}

impl QuiescenceTracker {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A task was accepted; must be balanced by [`finish`](Self::finish).
    pub(crate) fn enqueue(&self) {
        self.lock().in_flight += 1;
    }

    /// A submission was dropped without being accepted.
    pub(crate) fn reject(&self) {
        self.lock().summary.skipped += 1;
    }

    pub(crate) fn finish(&self, outcome: Outcome) {
        let mut state = self.lock();
        match outcome {
            Outcome::Completed => state.summary.completed += 1,
            Outcome::Recoverable(failure) => state.summary.recoverable_failures.push(failure),
            Outcome::Fatal(failure) => {
                // Only the first fatal failure is reported
                if state.fatal.is_none() {
                    state.fatal = Some(failure);
                }
            }
            Outcome::Skipped => state.summary.skipped += 1,
        }
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 {
            self.quiet.notify_all();
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Block until no task is in flight.
    pub(crate) fn wait(&self) -> Result<QuiescenceSummary, TaskFailure> {
        let mut state = self.lock();
        while state.in_flight > 0 {
            state = self
                .quiet
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match &state.fatal {
            Some(failure) => Err(failure.clone()),
            None => Ok(state.summary.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasepool_domain::TaskError;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_with_nothing_in_flight() {
        let tracker = QuiescenceTracker::default();
        assert_eq!(tracker.wait().unwrap(), QuiescenceSummary::default());
    }

    #[test]
    fn test_wait_blocks_until_finished() {
        let tracker = Arc::new(QuiescenceTracker::default());
        tracker.enqueue();
        tracker.enqueue();

        let worker = {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                tracker.finish(Outcome::Completed);
                tracker.finish(Outcome::Skipped);
            })
        };

        let summary = tracker.wait().unwrap();
        worker.join().unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[test]
    fn test_first_fatal_failure_wins() {
        let tracker = QuiescenceTracker::default();
        for _ in 0..3 {
            tracker.enqueue();
        }
        tracker.finish(Outcome::Fatal(TaskFailure::new("a", TaskError::panic("first"))));
        tracker.finish(Outcome::Recoverable(TaskFailure::new(
            "a",
            TaskError::interrupted(),
        )));
        tracker.finish(Outcome::Fatal(TaskFailure::new("b", TaskError::panic("second"))));

        let failure = tracker.wait().unwrap_err();
        assert_eq!(failure.pool, "a");
        assert_eq!(failure.error.message(), "first");
    }

    #[test]
    fn test_reject_counts_skipped_without_in_flight() {
        let tracker = QuiescenceTracker::default();
        tracker.reject();
        assert_eq!(tracker.in_flight(), 0);
        assert_eq!(tracker.wait().unwrap().skipped, 1);
    }
}
