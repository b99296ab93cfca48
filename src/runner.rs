//! Plan execution on an owned worker pool.
//!
//! [`Executor`] owns a multi-threaded tokio runtime: fanned-out branches are tokio tasks
//! and actions run on its threads. One executor can run any number of graphs, one
//! [`TaskGraph`] at a time per graph.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

use crate::budget::Budget;
use crate::config::ExecutorConfig;
use crate::dispatch::{spawn_roots, Execution};
use crate::error::{DagError, DagResult};
use crate::graph::TaskGraph;
use crate::types::NodeId;

/// What happened during one plan execution.
///
/// Per-task outcomes are observed through callbacks and [`TaskGraph::result`]; the
/// report only carries execution-wide facts.
#[derive(Debug)]
pub struct RunReport {
    elapsed: Duration,
    timed_out: bool,
    faults: Vec<DagError>,
    stranded: Vec<NodeId>,
}

impl RunReport {
    /// Wall time from plan start until the call returned.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// `true` if the controller gave up waiting after the total budget and force-failed
    /// the remaining nodes.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Branches that ended abnormally (for example a panicking callback).
    ///
    /// After a controller timeout this only covers branches that ended before the call
    /// returned; later faults are still logged as errors.
    pub fn faults(&self) -> &[DagError] {
        &self.faults
    }

    /// Nodes the controller resolved as TIMEOUT because no branch resolved them.
    pub fn stranded(&self) -> &[NodeId] {
        &self.stranded
    }

    /// No faults, no controller timeout and no stranded nodes.
    pub fn is_clean(&self) -> bool {
        !self.timed_out && self.faults.is_empty() && self.stranded.is_empty()
    }
}

/// Runs task graphs on a shared worker pool.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use taskweave::{Executor, ExecutorConfig, TaskGraph};
///
/// let executor = Executor::with_config(ExecutorConfig {
///     worker_threads: 2,
///     ..ExecutorConfig::default()
/// })
/// .unwrap();
///
/// let graph = TaskGraph::new();
/// let report = executor
///     .run(&graph, Duration::from_millis(50), Vec::<taskweave::NodeId>::new())
///     .unwrap();
/// assert!(report.is_clean());
///
/// executor.shutdown();
/// ```
pub struct Executor {
    runtime: Runtime,
    config: ExecutorConfig,
}

impl Executor {
    /// Executor with [`ExecutorConfig::default`].
    pub fn new() -> DagResult<Self> {
        Self::with_config(ExecutorConfig::default())
    }

    /// # Errors
    ///
    /// `DagError::InvalidConfig` if `config` fails validation, `DagError::Runtime` if the
    /// pool cannot be started.
    pub fn with_config(config: ExecutorConfig) -> DagResult<Self> {
        config.validate()?;

        let mut builder = Builder::new_multi_thread();
        builder
            .worker_threads(config.worker_threads)
            .max_blocking_threads(config.max_blocking_threads)
            .thread_name(config.thread_name.clone())
            .enable_time();
        if let Some(size) = config.thread_stack_size {
            builder.thread_stack_size(size);
        }
        let runtime = builder.build()?;

        #[cfg(feature = "tracing")]
        debug!(
            worker_threads = config.worker_threads,
            max_blocking_threads = config.max_blocking_threads,
            "worker pool started"
        );

        Ok(Self { runtime, config })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute everything reachable from `roots`, blocking until it has resolved.
    ///
    /// Every root receives the full `budget`. If the graph has not resolved once the
    /// budget has elapsed, every reachable node still pending or running is resolved as
    /// TIMEOUT and the call returns; actions already running finish in the background.
    ///
    /// # Errors
    ///
    /// `DagError::InvalidHandle` for a root outside the graph, `DagError::AlreadyExecuted`
    /// if the graph ran before without [`TaskGraph::reset`].
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async context; use [`Executor::run_async`] there.
    pub fn run<I>(
        &self,
        graph: &TaskGraph,
        budget: impl Into<Budget>,
        roots: I,
    ) -> DagResult<RunReport>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let roots: Vec<NodeId> = roots.into_iter().map(Into::into).collect();
        let exec = graph.begin_execution(&roots)?;
        Ok(self.runtime.block_on(supervise(exec, roots, budget.into())))
    }

    /// Awaitable form of [`Executor::run`]. The plan runs on this executor's pool no
    /// matter which runtime polls the returned future.
    pub async fn run_async<I>(
        &self,
        graph: &TaskGraph,
        budget: impl Into<Budget>,
        roots: I,
    ) -> DagResult<RunReport>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let roots: Vec<NodeId> = roots.into_iter().map(Into::into).collect();
        let exec = graph.begin_execution(&roots)?;
        self.runtime
            .spawn(supervise(exec, roots, budget.into()))
            .await
            .map_err(|err| DagError::Runtime(std::io::Error::other(err)))
    }

    /// Release the worker pool, waiting at most the configured shutdown timeout for
    /// actions still running.
    ///
    /// # Panics
    ///
    /// Like dropping the executor, panics when called from inside an async context.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        debug!("shutting down worker pool");

        self.runtime.shutdown_timeout(self.config.shutdown_timeout());
    }
}

async fn supervise(exec: Arc<Execution>, roots: Vec<NodeId>, budget: Budget) -> RunReport {
    let started = Instant::now();

    #[cfg(feature = "tracing")]
    info!(
        root_count = roots.len(),
        budget_ms = budget.remaining_ms(),
        "starting plan"
    );

    let branches = spawn_roots(&exec, &roots, budget);

    // With nothing left to spend the roots time themselves out; just join.
    let timed_out = if budget.is_exhausted() {
        exec.join(branches).await;
        false
    } else {
        // The join runs as its own task so branches outliving a controller timeout are
        // still joined and their faults recorded.
        let mut joiner = tokio::spawn({
            let exec = Arc::clone(&exec);
            async move { exec.join(branches).await }
        });
        tokio::time::timeout(budget.as_duration(), &mut joiner)
            .await
            .is_err()
    };

    #[cfg(feature = "tracing")]
    {
        if timed_out {
            debug!(
                budget_ms = budget.remaining_ms(),
                "controller timeout; force-failing unresolved nodes"
            );
        }
    }

    // Also covers nodes no branch could reach, such as the successors of a branch that
    // panicked in a callback or a root waiting on predecessors that never run.
    let stranded = exec.resolve_unfinished(&roots);

    let report = RunReport {
        elapsed: started.elapsed(),
        timed_out,
        faults: exec.take_faults(),
        stranded,
    };

    #[cfg(feature = "tracing")]
    info!(
        elapsed_ms = report.elapsed.as_millis() as u64,
        timed_out = report.timed_out,
        fault_count = report.faults.len(),
        stranded_count = report.stranded.len(),
        "plan finished"
    );

    report
}
