//! Task-level value objects shared by every quiescing executor.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Weight class of a submitted task; decides which pool or lane runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Ordinary evaluation work
    #[default]
    Default,
    /// Disproportionately CPU-consuming evaluation work
    CpuHeavy,
    /// Execution-phase work (actions)
    Execution,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Default => "default",
            TaskKind::CpuHeavy => "cpu_heavy",
            TaskKind::Execution => "execution",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What went wrong inside a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// The evaluated node itself failed
    Evaluation,
    /// Evaluation was interrupted before completion
    Interrupted,
    /// The task panicked
    Panic,
    /// A bug in the evaluator or an invariant violation
    Internal,
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskErrorKind::Evaluation => "evaluation error",
            TaskErrorKind::Interrupted => "interrupted",
            TaskErrorKind::Panic => "panic",
            TaskErrorKind::Internal => "internal error",
        };
        write!(f, "{}", s)
    }
}

/// Error returned by a task body.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TaskError {
    kind: TaskErrorKind,
    message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Evaluation, message)
    }

    pub fn interrupted() -> Self {
        Self::new(TaskErrorKind::Interrupted, "evaluation interrupted")
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Panic, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Internal, message)
    }

    pub fn kind(&self) -> TaskErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Verdict of an error classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClassification {
    /// Recorded; other work keeps running
    Recoverable,
    /// Stops the executor (fail-fast) and is reported by quiescence
    Fatal,
}

impl ErrorClassification {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorClassification::Fatal)
    }
}

/// A task error attributed to the pool that ran it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("task failed in pool '{pool}': {error}")]
pub struct TaskFailure {
    pub pool: String,
    pub error: TaskError,
}

impl TaskFailure {
    pub fn new(pool: impl Into<String>, error: TaskError) -> Self {
        Self {
            pool: pool.into(),
            error,
        }
    }
}

/// Outcome of a successful wait for quiescence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuiescenceSummary {
    /// Tasks whose body returned `Ok`
    pub completed: usize,
    /// Failures classified as recoverable, in completion order
    pub recoverable_failures: Vec<TaskFailure>,
    /// Tasks dropped without running after a fatal failure
    pub skipped: usize,
}

impl QuiescenceSummary {
    /// Number of task bodies that actually ran.
    pub fn ran(&self) -> usize {
        self.completed + self.recoverable_failures.len()
    }
}
