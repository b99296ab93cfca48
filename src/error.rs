//! Error types for graph construction and execution.
//!
//! Two families live here:
//!
//! - [`DagError`]: infrastructure faults and API misuse. These are what
//!   [`Executor::run`](crate::Executor::run) and the graph accessors return as `Err`.
//! - [`TaskError`]: the failure captured from a worker's action. It never escapes the
//!   engine as `Err`; it is carried inside an `Exception` [`TaskResult`](crate::TaskResult)
//!   and handed to dependents that fast-fail because of it.

use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during graph construction and execution
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DagError {
    /// A fanned-out branch panicked outside of a worker action (usually in a callback)
    #[error("branch starting at task #{task_id} panicked: {panic_message}")]
    BranchPanicked { task_id: usize, panic_message: String },

    /// A fanned-out branch was cancelled before it completed, typically because the
    /// worker pool shut down underneath it
    #[error("branch starting at task #{task_id} was cancelled before completion")]
    BranchCancelled { task_id: usize },

    /// The task has not recorded a result yet
    #[error("no result recorded for task #{task_id}")]
    ResultNotFound { task_id: usize },

    /// The handle does not refer to a task of this graph
    #[error("task #{task_id} does not exist in this graph")]
    InvalidHandle { task_id: usize },

    /// The handle's output type does not match the stored result
    #[error("type mismatch for task #{task_id}: expected {expected}, found {found}")]
    TypeMismatch {
        task_id: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// The graph is still referenced by an execution and cannot be changed
    #[error("graph is still referenced by a running execution")]
    GraphInUse,

    /// The graph was already executed; call `TaskGraph::reset` before running it again
    #[error("graph was already executed; reset it before running again")]
    AlreadyExecuted,

    /// Executor configuration was rejected
    #[error("invalid executor configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be created
    #[error("failed to build worker pool: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Result type for graph operations
pub type DagResult<T> = Result<T, DagError>;

/// Failure captured from a worker action.
///
/// Cheap to clone: a dependent that fast-fails because of a must dependency's exception
/// carries the very same error in its own result.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The action returned an error value
    #[error(transparent)]
    Action(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The action failed with a plain message
    #[error("{0}")]
    Message(String),

    /// The action panicked; the panic was caught and converted
    #[error("action panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Wrap any error type.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TaskError::Action(Arc::new(error))
    }

    /// Build an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        TaskError::Message(message.into())
    }

    /// `true` if the action panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        TaskError::Message(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        TaskError::Message(message.to_string())
    }
}

/// Render a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
