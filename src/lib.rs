//! In-process task-graph executor
//!
//! Assemble a directed acyclic graph of tasks, each a parameter, a [`Worker`] and a
//! [`Callback`], connected by must or optional dependency edges. Submit the graph with one
//! global time budget and get control back once every reachable task has resolved as
//! success, exception or timeout.
//!
//! # Features
//!
//! - **Idempotent firing**: every node state change is a single compare-and-set, so an
//!   action runs at most once and a callback fires exactly once, however many
//!   predecessors race to wake the node.
//! - **Must and optional dependencies**: a node waits for all of its must predecessors
//!   and fails as soon as one of them fails; nodes with only optional predecessors fire
//!   on the first non-timeout signal.
//! - **Global budget**: the remaining time is threaded through every hop. A node entering
//!   with nothing left times out without starting its action.
//! - **Fan-out/join**: serial chains run inline on one task; several successors are
//!   spawned onto the shared pool and joined before the branch returns.
//! - **Failures are values**: timeouts and action errors are recorded as [`TaskResult`]s
//!   carrying the worker's default value; they never escape as `Err`.
//!
//! # Quick Start
//!
//! ```
//! use taskweave::{Budget, Executor, Inputs, TaskError, TaskGraph, TaskHandle, Worker};
//!
//! struct Value(i32);
//!
//! impl Worker for Value {
//!     type Param = ();
//!     type Output = i32;
//!
//!     fn action(&self, _: &(), _: &Inputs<'_>) -> Result<i32, TaskError> {
//!         Ok(self.0)
//!     }
//!
//!     fn default_value(&self) -> i32 {
//!         0
//!     }
//! }
//!
//! struct Add(TaskHandle<i32>, TaskHandle<i32>);
//!
//! impl Worker for Add {
//!     type Param = ();
//!     type Output = i32;
//!
//!     fn action(&self, _: &(), inputs: &Inputs<'_>) -> Result<i32, TaskError> {
//!         let a = inputs.get(self.0).ok_or("left operand missing")?;
//!         let b = inputs.get(self.1).ok_or("right operand missing")?;
//!         Ok(a.value() + b.value())
//!     }
//!
//!     fn default_value(&self) -> i32 {
//!         -1
//!     }
//! }
//!
//! let mut graph = TaskGraph::new();
//! let x = graph.add_task_with(Value(2), ());
//! let y = graph.add_task_with(Value(3), ());
//! let sum = graph.add_task_with(Add(x, y), ());
//! graph.add_next(x, sum).unwrap();
//! graph.add_next(y, sum).unwrap();
//!
//! let executor = Executor::new().unwrap();
//! let report = executor.run(&graph, Budget::from_millis(1_000), [x, y]).unwrap();
//! assert!(report.is_clean());
//! assert_eq!(*graph.result(sum).unwrap().value(), 5);
//! executor.shutdown();
//! ```
//!
//! # Core Concepts
//!
//! ## Worker and Callback
//!
//! [`Worker::action`] is a blocking call producing the task's value from its parameter.
//! It may read the results of other tasks through [`Inputs`]. [`Worker::default_value`] is
//! recorded whenever the task times out or fails. [`Callback::begin`] runs right before
//! the action and [`Callback::result`] exactly once after the task resolved.
//!
//! ## Dependencies
//!
//! [`TaskGraph::add_next`] attaches a successor and creates a must edge back from it.
//! [`TaskGraph::set_optional`] demotes edges before execution starts.
//!
//! ## Budget
//!
//! A [`Budget`] is the signed number of milliseconds the whole plan has left. Each node
//! subtracts its own elapsed time before handing the budget to its successors. The
//! budget only decides whether a node may *start*: an action already running is never
//! interrupted. When the total budget elapses, the [`Executor`] stops waiting, resolves
//! every node still pending or running as TIMEOUT, and returns; late results are
//! discarded.
//!
//! ## Pool sizing
//!
//! Joins are awaited, not blocked on, so a small pool never deadlocks. It does limit
//! parallelism: branches only run side by side while there are worker threads for
//! them. See [`ExecutorConfig`].
//!
//! # Error Handling
//!
//! [`DagError`] covers API misuse (unknown handles, re-running a graph without
//! [`TaskGraph::reset`]) and infrastructure faults at join points, which are collected in
//! the [`RunReport`] instead of aborting sibling branches. [`TaskError`] is what a worker
//! returns; it ends up inside the task's `Exception` result and in the results of must
//! dependents that fail because of it.
//!
//! # Optional Tracing Support
//!
//! taskweave provides optional observability through the `tracing` crate. The
//! instrumentation is conditionally compiled behind the `tracing` feature:
//!
//! ```toml
//! [dependencies]
//! taskweave = { version = "0.1", features = ["tracing"] }
//! tracing-subscriber = "0.3"
//! ```
//!
//! ```no_run
//! use tracing_subscriber::{fmt, EnvFilter};
//!
//! fmt()
//!     .with_env_filter(
//!         EnvFilter::try_from_default_env()
//!             .unwrap_or_else(|_| EnvFilter::new("taskweave=info"))
//!     )
//!     .init();
//! ```
//!
//! ## Log Levels
//!
//! - **INFO**: plan start/completion
//! - **DEBUG**: task additions, edge wiring, pool start/shutdown, controller timeouts
//! - **TRACE**: firing, fast-fails, inline vs spawned fan-out, lost races
//! - **ERROR**: branches that panicked or were cancelled
//!
//! When the feature is disabled (the default) the logging code is removed at compile
//! time and `tracing` is not linked.

mod budget;
mod config;
mod deps;
mod dispatch;
mod error;
mod graph;
mod node;
mod runner;
mod task;
mod types;

pub use budget::Budget;
pub use config::{
    ExecutorConfig, ENV_MAX_BLOCKING_THREADS, ENV_SHUTDOWN_TIMEOUT_MS, ENV_WORKER_THREADS,
};
pub use deps::Dependency;
pub use error::{DagError, DagResult, TaskError};
pub use graph::TaskGraph;
pub use runner::{Executor, RunReport};
pub use task::{Callback, Inputs, NoopCallback, Worker};
pub use types::{NodeId, NodeState, ResultState, TaskHandle, TaskResult};
