//! Worker and callback capabilities.
//!
//! A task is assembled from two separate capabilities:
//!
//! - a [`Worker`] producing a value from the task's parameter (or a default value used
//!   whenever a timeout or exception result must be synthesized), and
//! - a [`Callback`] notified right before the action starts and exactly once after the
//!   node resolves.
//!
//! One type may implement both, but the graph always stores them as two values.

use std::sync::Arc;

use crate::error::TaskError;
use crate::node::ExecutableNode;
use crate::types::{NodeId, TaskHandle, TaskResult};

/// The action side of a task.
///
/// `action` is a blocking call. It runs on the thread that fires the node; concurrency
/// comes from fanning out independent branches, not from offloading the action.
///
/// # Examples
///
/// ```
/// use taskweave::{Inputs, TaskError, Worker};
///
/// struct Parse;
///
/// impl Worker for Parse {
///     type Param = String;
///     type Output = i64;
///
///     fn action(&self, param: &String, _inputs: &Inputs<'_>) -> Result<i64, TaskError> {
///         param.trim().parse().map_err(TaskError::new)
///     }
///
///     fn default_value(&self) -> i64 {
///         0
///     }
/// }
/// ```
pub trait Worker: Send + Sync + 'static {
    type Param: Send + Sync + 'static;
    type Output: Send + Sync + 'static;

    fn action(&self, param: &Self::Param, inputs: &Inputs<'_>) -> Result<Self::Output, TaskError>;

    /// Value recorded when the node times out or fails.
    fn default_value(&self) -> Self::Output;
}

/// The notification side of a task.
pub trait Callback<P, V>: Send + Sync + 'static {
    /// Called immediately before the action starts. Not called for nodes that fast-fail.
    fn begin(&self) {}

    /// Called exactly once after the node's final resolution.
    ///
    /// `success` is `false` for both timeout and exception outcomes.
    fn result(&self, success: bool, param: &P, result: &TaskResult<V>);
}

/// Callback that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallback;

impl<P, V> Callback<P, V> for NoopCallback {
    fn result(&self, _success: bool, _param: &P, _result: &TaskResult<V>) {}
}

/// Read access to the results recorded so far in the running graph.
///
/// Passed to [`Worker::action`] so an action can consume its predecessors' values.
pub struct Inputs<'graph> {
    current: NodeId,
    nodes: &'graph [Arc<dyn ExecutableNode>],
}

impl<'graph> Inputs<'graph> {
    pub(crate) fn new(current: NodeId, nodes: &'graph [Arc<dyn ExecutableNode>]) -> Self {
        Self { current, nodes }
    }

    /// The node whose action is running.
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Result of another node, or `None` if it has not resolved (or the handle belongs to
    /// a different graph or output type).
    pub fn get<V>(&self, handle: TaskHandle<V>) -> Option<Arc<TaskResult<V>>>
    where
        V: Send + Sync + 'static,
    {
        self.nodes
            .get(handle.id.0)?
            .result_any()?
            .downcast::<TaskResult<V>>()
            .ok()
    }
}
