//! Task nodes and their firing protocol.
//!
//! Provides type erasure to keep tasks of different worker types in one graph.
//!
//! - **TypedNode\<W, C\>**: owns one worker + callback + param and the lifecycle state
//! - **ExecutableNode**: object-safe view the dispatcher drives
//!
//! Every state change goes through [`StateCell::transition`], a single compare-and-set.
//! Whoever wins a transition owns the side effects that follow it (running the action,
//! recording the result, invoking the callback); everybody else backs off silently.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::trace;

use crate::error::{panic_message, TaskError};
use crate::task::{Callback, Inputs, Worker};
use crate::types::{NodeId, NodeState, ResultState, TaskResult};

/// Atomic lifecycle flag.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(NodeState::Init as u8))
    }

    pub(crate) fn load(&self) -> NodeState {
        NodeState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Attempt `from → to`; reports whether this call performed the transition.
    pub(crate) fn transition(&self, from: NodeState, to: NodeState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn reset(&self) {
        self.0.store(NodeState::Init as u8, Ordering::SeqCst);
    }
}

/// Type-independent part of a recorded result, enough to evaluate readiness.
#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub(crate) state: ResultState,
    pub(crate) error: Option<TaskError>,
}

/// Internal trait for driving heterogeneous tasks.
///
/// This is an implementation detail and not part of the public API.
pub(crate) trait ExecutableNode: Send + Sync {
    fn id(&self) -> NodeId;

    fn state(&self) -> NodeState;

    /// State and error of the recorded result, `None` while unresolved.
    fn outcome(&self) -> Option<Outcome>;

    /// The recorded `Arc<TaskResult<V>>`, erased.
    fn result_any(&self) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Run the action if this call wins `Init → Working`.
    fn fire(&self, inputs: &Inputs<'_>);

    /// Resolve the node as failed without running the action.
    ///
    /// `error = None` records a timeout, `Some` an exception. Returns `false` (and does
    /// nothing) if the node was not in `expected`.
    fn fast_fail(&self, expected: NodeState, error: Option<TaskError>) -> bool;

    /// Resolve a node that is still `Init` or `Working` as timed out.
    fn force_fail(&self) -> bool {
        loop {
            let current = self.state();
            if current.is_terminal() {
                return false;
            }
            if self.fast_fail(current, None) {
                return true;
            }
        }
    }

    /// Back to `Init` with no result.
    fn reset(&self);

    /// Name of the worker's output type.
    fn output_type(&self) -> &'static str;
}

/// Fully-typed node storage for a single task.
pub(crate) struct TypedNode<W: Worker, C> {
    id: NodeId,
    worker: W,
    param: W::Param,
    callback: C,
    state: StateCell,
    result: Mutex<Option<Arc<TaskResult<W::Output>>>>,
}

impl<W, C> TypedNode<W, C>
where
    W: Worker,
    C: Callback<W::Param, W::Output>,
{
    pub(crate) fn new(id: NodeId, worker: W, param: W::Param, callback: C) -> Self {
        Self {
            id,
            worker,
            param,
            callback,
            state: StateCell::new(),
            result: Mutex::new(None),
        }
    }

    pub(crate) fn result(&self) -> Option<Arc<TaskResult<W::Output>>> {
        self.result.lock().clone()
    }

    fn run_action(&self, inputs: &Inputs<'_>) -> Result<W::Output, TaskError> {
        let call = || {
            panic::catch_unwind(AssertUnwindSafe(|| self.worker.action(&self.param, inputs)))
                .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload))))
        };

        // Hand the worker thread's other tasks to the pool while the action blocks.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(call)
            }
            _ => call(),
        }
    }
}

impl<W, C> ExecutableNode for TypedNode<W, C>
where
    W: Worker,
    C: Callback<W::Param, W::Output>,
{
    fn id(&self) -> NodeId {
        self.id
    }

    fn state(&self) -> NodeState {
        self.state.load()
    }

    fn outcome(&self) -> Option<Outcome> {
        self.result.lock().as_ref().map(|result| Outcome {
            state: result.state(),
            error: result.error().cloned(),
        })
    }

    fn result_any(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.result()
            .map(|result| result as Arc<dyn Any + Send + Sync>)
    }

    fn fire(&self, inputs: &Inputs<'_>) {
        if !self.state.transition(NodeState::Init, NodeState::Working) {
            #[cfg(feature = "tracing")]
            trace!(task_id = self.id.0, "fire lost the race; node already claimed");
            return;
        }

        #[cfg(feature = "tracing")]
        trace!(task_id = self.id.0, "firing task");

        self.callback.begin();

        let value = match self.run_action(inputs) {
            Ok(value) => value,
            Err(error) => {
                #[cfg(feature = "tracing")]
                trace!(task_id = self.id.0, %error, "action failed");
                self.fast_fail(NodeState::Working, Some(error));
                return;
            }
        };

        if !self.state.transition(NodeState::Working, NodeState::Finish) {
            // Force-failed while the action was in flight; the recorded timeout stands.
            #[cfg(feature = "tracing")]
            trace!(task_id = self.id.0, "discarding late success");
            return;
        }

        let result = Arc::new(TaskResult::success(value));
        *self.result.lock() = Some(Arc::clone(&result));
        self.callback.result(true, &self.param, &result);
    }

    fn fast_fail(&self, expected: NodeState, error: Option<TaskError>) -> bool {
        if !self.state.transition(expected, NodeState::Error) {
            return false;
        }

        #[cfg(feature = "tracing")]
        trace!(
            task_id = self.id.0,
            from = ?expected,
            exception = error.is_some(),
            "fast-failing task"
        );

        let result = {
            let mut slot = self.result.lock();
            match slot.as_ref() {
                Some(existing) => Arc::clone(existing),
                None => {
                    let default = self.worker.default_value();
                    let synthesized = Arc::new(match error {
                        None => TaskResult::timeout(default),
                        Some(error) => TaskResult::exception(default, error),
                    });
                    *slot = Some(Arc::clone(&synthesized));
                    synthesized
                }
            }
        };

        self.callback.result(false, &self.param, &result);
        true
    }

    fn reset(&self) {
        *self.result.lock() = None;
        self.state.reset();
    }

    fn output_type(&self) -> &'static str {
        std::any::type_name::<W::Output>()
    }
}
