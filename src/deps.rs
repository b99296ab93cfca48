//! Dependency edges and the readiness evaluator for nodes with several predecessors.
//!
//! The evaluator is a pure decision over a snapshot of the edges and the predecessors'
//! recorded outcomes. It is invoked once per predecessor-completion event; several
//! invocations may race on different threads, and the node's `Init` compare-and-set
//! decides which of them actually fires or fails the node.

use crate::error::TaskError;
use crate::node::Outcome;
use crate::types::{NodeId, NodeState, ResultState};

/// Edge from a node back to one of its predecessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    pub(crate) predecessor: NodeId,
    pub(crate) must: bool,
}

impl Dependency {
    pub(crate) fn must(predecessor: NodeId) -> Self {
        Self {
            predecessor,
            must: true,
        }
    }

    pub fn predecessor(&self) -> NodeId {
        self.predecessor
    }

    /// `true` if the predecessor must succeed before the node may fire.
    pub fn is_must(&self) -> bool {
        self.must
    }
}

/// What a predecessor looks like at the moment of evaluation.
#[derive(Debug, Clone)]
pub(crate) struct PredecessorStatus {
    pub(crate) state: NodeState,
    pub(crate) outcome: Option<Outcome>,
}

/// Evaluator decision.
#[derive(Debug, Clone)]
pub(crate) enum Readiness {
    Fire,
    /// `None` synthesizes a timeout, `Some` an exception carrying the error.
    FastFail(Option<TaskError>),
    /// Not ready; a later predecessor event re-runs the evaluation.
    Wait,
}

/// Failure derived from a predecessor's outcome, if it did not succeed.
pub(crate) fn inherited_failure(outcome: &Outcome) -> Option<Option<TaskError>> {
    match outcome.state {
        ResultState::Success => None,
        ResultState::Timeout => Some(None),
        ResultState::Exception => Some(outcome.error.clone()),
    }
}

/// Decide whether a node with several dependency edges may fire.
///
/// `trigger` is the predecessor whose completion caused this evaluation.
pub(crate) fn evaluate<F>(edges: &[Dependency], trigger: Option<NodeId>, status_of: F) -> Readiness
where
    F: Fn(NodeId) -> PredecessorStatus,
{
    let musts: Vec<NodeId> = edges
        .iter()
        .filter(|edge| edge.must)
        .map(|edge| edge.predecessor)
        .collect();

    if musts.is_empty() {
        // Optional predecessors race to wake the node; a timed-out waker fails it.
        let timed_out = trigger
            .and_then(|id| status_of(id).outcome)
            .is_some_and(|outcome| outcome.state == ResultState::Timeout);
        return if timed_out {
            Readiness::FastFail(None)
        } else {
            Readiness::Fire
        };
    }

    let trigger_is_must = trigger.is_some_and(|id| musts.contains(&id));
    if !trigger_is_must {
        return Readiness::Wait;
    }

    let mut pending = false;
    for id in musts {
        let status = status_of(id);
        match status.outcome {
            Some(ref outcome) if status.state != NodeState::Working => {
                if let Some(failure) = inherited_failure(outcome) {
                    return Readiness::FastFail(failure);
                }
            }
            _ => pending = true,
        }
    }

    if pending {
        Readiness::Wait
    } else {
        Readiness::Fire
    }
}
