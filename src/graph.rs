//! The owning container for nodes and edges.
//!
//! Nodes live in one `Vec` and refer to each other only through [`NodeId`]s, so there are
//! no ownership cycles between predecessors and successors. Edges are plain data and are
//! snapshotted into each execution; node state is shared with it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::deps::Dependency;
use crate::dispatch::Execution;
use crate::error::{DagError, DagResult};
use crate::node::{ExecutableNode, TypedNode};
use crate::task::{Callback, NoopCallback, Worker};
use crate::types::{NodeId, NodeState, TaskHandle, TaskResult};

/// A directed acyclic graph of tasks, consumed by one execution at a time.
///
/// # Examples
///
/// ```
/// use taskweave::{Budget, Executor, Inputs, TaskError, TaskGraph, Worker};
///
/// struct Greet;
///
/// impl Worker for Greet {
///     type Param = &'static str;
///     type Output = String;
///
///     fn action(&self, name: &&'static str, _: &Inputs<'_>) -> Result<String, TaskError> {
///         Ok(format!("hello {name}"))
///     }
///
///     fn default_value(&self) -> String {
///         String::new()
///     }
/// }
///
/// let mut graph = TaskGraph::new();
/// let first = graph.add_task_with(Greet, "a");
/// let second = graph.add_task_with(Greet, "b");
/// graph.add_next(first, second).unwrap();
///
/// let executor = Executor::new().unwrap();
/// executor
///     .run(&graph, Budget::from_millis(1_000), [first.id()])
///     .unwrap();
///
/// assert_eq!(graph.result(second).unwrap().value(), "hello b");
/// executor.shutdown();
/// ```
pub struct TaskGraph {
    pub(crate) nodes: Vec<Arc<dyn ExecutableNode>>,
    pub(crate) successors: Vec<Vec<NodeId>>,
    pub(crate) dependencies: Vec<Vec<Dependency>>,
    pub(crate) executed: AtomicBool,
    /// Cloned into every execution; more than one strong reference means one is live.
    pub(crate) active: Arc<()>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            successors: Vec::new(),
            dependencies: Vec::new(),
            executed: AtomicBool::new(false),
            active: Arc::new(()),
        }
    }

    /// Add a task built from a worker, its parameter and a callback.
    pub fn add_task<W, C>(
        &mut self,
        worker: W,
        param: W::Param,
        callback: C,
    ) -> TaskHandle<W::Output>
    where
        W: Worker,
        C: Callback<W::Param, W::Output>,
    {
        let id = NodeId(self.nodes.len());

        #[cfg(feature = "tracing")]
        debug!(
            task_id = id.0,
            worker = std::any::type_name::<W>(),
            "adding task to graph"
        );

        self.nodes
            .push(Arc::new(TypedNode::new(id, worker, param, callback)));
        self.successors.push(Vec::new());
        self.dependencies.push(Vec::new());
        TaskHandle::new(id)
    }

    /// Add a task whose outcome is only observed through [`TaskGraph::result`].
    pub fn add_task_with<W: Worker>(
        &mut self,
        worker: W,
        param: W::Param,
    ) -> TaskHandle<W::Output> {
        self.add_task(worker, param, NoopCallback)
    }

    /// Attach `next` as a successor of `from`, creating a must edge from `next` back to
    /// `from`.
    pub fn add_next(&mut self, from: impl Into<NodeId>, next: impl Into<NodeId>) -> DagResult<()> {
        let (from, next) = (from.into(), next.into());
        self.ensure_idle()?;
        self.check(from)?;
        self.check(next)?;

        #[cfg(feature = "tracing")]
        debug!(from = from.0, next = next.0, "wiring successor");

        self.successors[from.0].push(next);
        self.dependencies[next.0].push(Dependency::must(from));
        Ok(())
    }

    /// Attach several successors to `from`.
    pub fn add_nexts<I>(&mut self, from: impl Into<NodeId>, nexts: I) -> DagResult<()>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let from = from.into();
        for next in nexts {
            self.add_next(from, next)?;
        }
        Ok(())
    }

    /// Demote the edges from `node` to each of `predecessors` to optional.
    ///
    /// Predecessors that `node` does not depend on are ignored.
    pub fn set_optional<I>(&mut self, node: impl Into<NodeId>, predecessors: I) -> DagResult<()>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let node = node.into();
        self.ensure_idle()?;
        self.check(node)?;

        let predecessors: Vec<NodeId> = predecessors.into_iter().map(Into::into).collect();
        for edge in &mut self.dependencies[node.0] {
            if predecessors.contains(&edge.predecessor) {
                #[cfg(feature = "tracing")]
                debug!(
                    task_id = node.0,
                    predecessor = edge.predecessor.0,
                    "demoting dependency to optional"
                );
                edge.must = false;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn successors(&self, node: impl Into<NodeId>) -> DagResult<&[NodeId]> {
        let node = node.into();
        self.check(node)?;
        Ok(&self.successors[node.0])
    }

    pub fn dependencies(&self, node: impl Into<NodeId>) -> DagResult<&[Dependency]> {
        let node = node.into();
        self.check(node)?;
        Ok(&self.dependencies[node.0])
    }

    /// Current lifecycle state of a node.
    pub fn state(&self, node: impl Into<NodeId>) -> DagResult<NodeState> {
        let node = node.into();
        self.check(node)?;
        Ok(self.nodes[node.0].state())
    }

    /// Retrieve a task's result after (or during) an execution.
    ///
    /// # Errors
    ///
    /// Returns `DagError::ResultNotFound` if the task has not resolved yet and
    /// `DagError::TypeMismatch` if the handle's type does not match the task.
    pub fn result<V: Send + Sync + 'static>(
        &self,
        handle: TaskHandle<V>,
    ) -> DagResult<Arc<TaskResult<V>>> {
        self.check(handle.id)?;
        let node = &self.nodes[handle.id.0];
        let erased = node
            .result_any()
            .ok_or(DagError::ResultNotFound {
                task_id: handle.id.0,
            })?;

        erased
            .downcast::<TaskResult<V>>()
            .map_err(|_| DagError::TypeMismatch {
                task_id: handle.id.0,
                expected: std::any::type_name::<V>(),
                found: node.output_type(),
            })
    }

    /// Abort a node that is still `Init` or `Working`, resolving it as timed out.
    ///
    /// Returns `false` if the node had already resolved.
    pub fn force_fail(&self, node: impl Into<NodeId>) -> DagResult<bool> {
        let node = node.into();
        self.check(node)?;
        Ok(self.nodes[node.0].force_fail())
    }

    /// Put every node back into `Init` so the graph can be executed again.
    ///
    /// # Errors
    ///
    /// Returns `DagError::GraphInUse` if an execution still references the graph (for
    /// example a branch whose action outlived a controller timeout).
    pub fn reset(&mut self) -> DagResult<()> {
        self.ensure_idle()?;
        for node in &self.nodes {
            node.reset();
        }
        self.executed.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Nodes reachable from `roots` through successor edges, roots included.
    pub fn reachable(&self, roots: &[NodeId]) -> Vec<NodeId> {
        reachable_from(&self.successors, roots)
    }

    /// Claim the graph for one execution and snapshot its topology.
    pub(crate) fn begin_execution(&self, roots: &[NodeId]) -> DagResult<Arc<Execution>> {
        for &root in roots {
            self.check(root)?;
        }

        if self
            .executed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DagError::AlreadyExecuted);
        }

        Ok(Arc::new(Execution::new(
            self.nodes.clone(),
            self.successors.clone(),
            self.dependencies.clone(),
            Arc::clone(&self.active),
        )))
    }

    fn ensure_idle(&self) -> DagResult<()> {
        if Arc::strong_count(&self.active) > 1 {
            return Err(DagError::GraphInUse);
        }
        Ok(())
    }

    fn check(&self, node: NodeId) -> DagResult<()> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DagError::InvalidHandle { task_id: node.0 })
        }
    }
}

pub(crate) fn reachable_from(successors: &[Vec<NodeId>], roots: &[NodeId]) -> Vec<NodeId> {
    let mut seen = vec![false; successors.len()];
    let mut order = Vec::new();
    let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        if node.0 >= seen.len() || seen[node.0] {
            continue;
        }
        seen[node.0] = true;
        order.push(node);
        queue.extend(successors[node.0].iter().copied());
    }

    order
}
