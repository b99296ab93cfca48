//! The per-node advance protocol and the fan-out/join dispatcher.
//!
//! An [`Execution`] is the shared view of one graph run: the nodes (shared with the
//! graph), a snapshot of the edges and the infrastructure faults collected at join
//! points. Every branch holds an `Arc` to it.
//!
//! [`advance`] drives a node and everything downstream of it. A single successor is
//! continued inline by the same loop, so serial chains neither hop through the pool nor
//! grow the stack. Several successors are spawned as separate tasks and joined before
//! `advance` returns.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};

#[cfg(feature = "tracing")]
use tracing::{error, trace};

use crate::budget::Budget;
use crate::deps::{evaluate, inherited_failure, Dependency, PredecessorStatus, Readiness};
use crate::error::{panic_message, DagError};
use crate::graph::reachable_from;
use crate::node::ExecutableNode;
use crate::task::Inputs;
use crate::types::{NodeId, NodeState};

pub(crate) struct Execution {
    nodes: Vec<Arc<dyn ExecutableNode>>,
    successors: Vec<Vec<NodeId>>,
    dependencies: Vec<Vec<Dependency>>,
    faults: Mutex<Vec<DagError>>,
    _active: Arc<()>,
}

impl Execution {
    pub(crate) fn new(
        nodes: Vec<Arc<dyn ExecutableNode>>,
        successors: Vec<Vec<NodeId>>,
        dependencies: Vec<Vec<Dependency>>,
        active: Arc<()>,
    ) -> Self {
        debug_assert!(nodes.iter().enumerate().all(|(i, node)| node.id().index() == i));
        Self {
            nodes,
            successors,
            dependencies,
            faults: Mutex::new(Vec::new()),
            _active: active,
        }
    }

    fn status(&self, id: NodeId) -> PredecessorStatus {
        let node = &self.nodes[id.0];
        PredecessorStatus {
            state: node.state(),
            outcome: node.outcome(),
        }
    }

    /// Try to resolve `id`, woken by `from` with `budget` remaining.
    ///
    /// Returns `true` once the node is resolved, meaning its successors must be
    /// advanced. A node left `Init` (not ready yet) or `Working` (another caller is
    /// running its action and will fan out itself) returns `false`.
    pub(crate) fn step(&self, id: NodeId, from: Option<NodeId>, budget: Budget) -> bool {
        let node = &self.nodes[id.0];

        if budget.is_exhausted() {
            #[cfg(feature = "tracing")]
            trace!(
                task_id = id.0,
                remaining_ms = budget.remaining_ms(),
                "budget exhausted at entry"
            );
            node.fast_fail(NodeState::Init, None);
            return node.state().is_terminal();
        }

        if node.state() != NodeState::Init {
            #[cfg(feature = "tracing")]
            trace!(task_id = id.0, state = ?node.state(), "already claimed by another path");
            return node.state().is_terminal();
        }

        let inputs = Inputs::new(id, &self.nodes);
        match self.dependencies[id.0].as_slice() {
            [] => node.fire(&inputs),
            [single] => {
                let failure = self.nodes[single.predecessor.0]
                    .outcome()
                    .and_then(|outcome| inherited_failure(&outcome));
                match failure {
                    Some(cause) => {
                        node.fast_fail(NodeState::Init, cause);
                    }
                    None => node.fire(&inputs),
                }
            }
            edges => match evaluate(edges, from, |p| self.status(p)) {
                Readiness::Fire => node.fire(&inputs),
                Readiness::FastFail(cause) => {
                    node.fast_fail(NodeState::Init, cause);
                }
                Readiness::Wait => {
                    #[cfg(feature = "tracing")]
                    trace!(task_id = id.0, from = ?from.map(|p| p.0), "dependencies not ready");
                    return false;
                }
            },
        }

        node.state().is_terminal()
    }

    /// Await every branch, recording the ones that ended abnormally.
    ///
    /// A faulty branch never short-circuits the join of its siblings.
    pub(crate) async fn join(&self, branches: Vec<(NodeId, JoinHandle<()>)>) {
        let (ids, handles): (Vec<NodeId>, Vec<JoinHandle<()>>) = branches.into_iter().unzip();
        let outcomes = join_all(handles).await;
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            if let Err(err) = outcome {
                self.record_fault(id, err);
            }
        }
    }

    fn record_fault(&self, task_id: NodeId, err: JoinError) {
        let fault = if err.is_panic() {
            DagError::BranchPanicked {
                task_id: task_id.0,
                panic_message: panic_message(err.into_panic()),
            }
        } else {
            DagError::BranchCancelled { task_id: task_id.0 }
        };
        self.push_fault(fault);
    }

    fn push_fault(&self, fault: DagError) {
        #[cfg(feature = "tracing")]
        error!(error = %fault, "branch ended abnormally");

        self.faults.lock().push(fault);
    }

    pub(crate) fn take_faults(&self) -> Vec<DagError> {
        std::mem::take(&mut *self.faults.lock())
    }

    /// Force every node reachable from `roots` that is still `Init` or `Working` into a
    /// timeout, returning the ones this call resolved.
    ///
    /// A callback panicking during the sweep is recorded as a fault of its node.
    pub(crate) fn resolve_unfinished(&self, roots: &[NodeId]) -> Vec<NodeId> {
        reachable_from(&self.successors, roots)
            .into_iter()
            .filter(|id| {
                panic::catch_unwind(AssertUnwindSafe(|| self.nodes[id.0].force_fail()))
                    .unwrap_or_else(|payload| {
                        self.push_fault(DagError::BranchPanicked {
                            task_id: id.0,
                            panic_message: panic_message(payload),
                        });
                        true
                    })
            })
            .collect()
    }
}

/// Advance `id` and, once it resolves, everything downstream of it.
pub(crate) fn advance(
    exec: Arc<Execution>,
    id: NodeId,
    from: Option<NodeId>,
    budget: Budget,
) -> BoxFuture<'static, ()> {
    async move {
        let (mut id, mut from, mut budget) = (id, from, budget);
        loop {
            let started = Instant::now();
            if !exec.step(id, from, budget) {
                return;
            }
            let remaining = budget.after(started.elapsed());

            match exec.successors[id.0].as_slice() {
                [] => return,
                [next] => {
                    #[cfg(feature = "tracing")]
                    trace!(task_id = id.0, next = next.0, "continuing inline");
                    from = Some(id);
                    id = *next;
                    budget = remaining;
                }
                nexts => {
                    fan_out(&exec, id, nexts, remaining).await;
                    return;
                }
            }
        }
    }
    .boxed()
}

/// Spawn one branch per successor and wait for all of them.
async fn fan_out(exec: &Arc<Execution>, from: NodeId, nexts: &[NodeId], budget: Budget) {
    #[cfg(feature = "tracing")]
    trace!(
        task_id = from.0,
        branch_count = nexts.len(),
        remaining_ms = budget.remaining_ms(),
        "spawning branches"
    );

    let branches = nexts
        .iter()
        .map(|&next| {
            let branch = tokio::spawn(advance(Arc::clone(exec), next, Some(from), budget));
            (next, branch)
        })
        .collect();

    exec.join(branches).await;
}

/// Spawn every root with the full budget, as one fan-out without a predecessor.
pub(crate) fn spawn_roots(
    exec: &Arc<Execution>,
    roots: &[NodeId],
    budget: Budget,
) -> Vec<(NodeId, JoinHandle<()>)> {
    roots
        .iter()
        .map(|&root| {
            let branch = tokio::spawn(advance(Arc::clone(exec), root, None, budget));
            (root, branch)
        })
        .collect()
}
