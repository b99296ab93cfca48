//! Core type definitions for graph nodes and handles.
//!
//! This module defines the identifiers, typed handles, lifecycle states and the
//! immutable [`TaskResult`] snapshot shared by the rest of the crate.

use std::fmt;
use std::marker::PhantomData;

use crate::error::TaskError;

/// Opaque node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node inside its graph.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque, typed token for a task's result.
///
/// A `TaskHandle<V>` is returned by [`TaskGraph::add_task`](crate::TaskGraph::add_task).
/// Use it to:
/// 1. Wire edges with [`TaskGraph::add_next`](crate::TaskGraph::add_next)
/// 2. Read a predecessor's result from inside an action via [`Inputs::get`](crate::Inputs::get)
/// 3. Retrieve the result after execution with [`TaskGraph::result`](crate::TaskGraph::result)
///
/// Handles are cheap to clone and copy.
pub struct TaskHandle<V> {
    pub(crate) id: NodeId,
    pub(crate) _phantom: PhantomData<fn() -> V>,
}

impl<V> TaskHandle<V> {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Untyped identifier of the task.
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<V> Clone for TaskHandle<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for TaskHandle<V> {}

impl<V> fmt::Debug for TaskHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskHandle").field(&self.id.0).finish()
    }
}

impl<V> From<TaskHandle<V>> for NodeId {
    fn from(handle: TaskHandle<V>) -> Self {
        handle.id
    }
}

impl<V> From<&TaskHandle<V>> for NodeId {
    fn from(handle: &TaskHandle<V>) -> Self {
        handle.id
    }
}

/// Lifecycle of a node within one execution.
///
/// Transitions only go `Init → Working → {Finish | Error}` or `Init → Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeState {
    Init = 0,
    Working = 1,
    Finish = 2,
    Error = 3,
}

impl NodeState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => NodeState::Init,
            1 => NodeState::Working,
            2 => NodeState::Finish,
            _ => NodeState::Error,
        }
    }

    /// `true` for `Finish` and `Error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, NodeState::Finish | NodeState::Error)
    }
}

/// How a node resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultState {
    Success,
    Timeout,
    Exception,
}

/// Immutable snapshot of a resolved node.
#[derive(Debug, Clone)]
pub struct TaskResult<V> {
    value: V,
    state: ResultState,
    error: Option<TaskError>,
}

impl<V> TaskResult<V> {
    pub(crate) fn success(value: V) -> Self {
        Self {
            value,
            state: ResultState::Success,
            error: None,
        }
    }

    pub(crate) fn timeout(default: V) -> Self {
        Self {
            value: default,
            state: ResultState::Timeout,
            error: None,
        }
    }

    pub(crate) fn exception(default: V, error: TaskError) -> Self {
        Self {
            value: default,
            state: ResultState::Exception,
            error: Some(error),
        }
    }

    /// The produced value, or the worker's default when the node did not succeed.
    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn state(&self) -> ResultState {
        self.state
    }

    /// The captured error; present only when `state()` is `Exception`.
    pub fn error(&self) -> Option<&TaskError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.state == ResultState::Success
    }
}
