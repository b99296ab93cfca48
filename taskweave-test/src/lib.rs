//! Worker and callback helpers for internal use in taskweave tests and benchmarks.
//!
//! This crate is not meant for public use and offers no stability guarantees.

#![cfg(not(tarpaulin_include))]

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use taskweave::{Callback, Inputs, ResultState, TaskError, TaskResult, Worker};

/// Worker backed by a closure.
pub struct FnWorker<P, O, F> {
    f: F,
    default: O,
    _phantom: PhantomData<fn(P)>,
}

impl<P, O, F> Worker for FnWorker<P, O, F>
where
    P: Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
    F: Fn(&P, &Inputs<'_>) -> Result<O, TaskError> + Send + Sync + 'static,
{
    type Param = P;
    type Output = O;

    fn action(&self, param: &P, inputs: &Inputs<'_>) -> Result<O, TaskError> {
        (self.f)(param, inputs)
    }

    fn default_value(&self) -> O {
        self.default.clone()
    }
}

/// Convenience function to create a worker from a closure and the value it falls back to.
pub fn worker_fn<P, O, F>(default: O, f: F) -> FnWorker<P, O, F>
where
    P: Send + Sync + 'static,
    O: Clone + Send + Sync + 'static,
    F: Fn(&P, &Inputs<'_>) -> Result<O, TaskError> + Send + Sync + 'static,
{
    FnWorker {
        f,
        default,
        _phantom: PhantomData,
    }
}

/// Returns its parameter.
pub fn echo<T: Clone + Send + Sync + 'static>(default: T) -> impl Worker<Param = T, Output = T> {
    worker_fn(default, |param: &T, _: &Inputs<'_>| Ok(param.clone()))
}

/// Blocks for `sleep`, then yields `value`. Counts how often its action ran.
pub struct Sleeper<O> {
    pub sleep: Duration,
    pub value: O,
    pub default: O,
    pub calls: Arc<AtomicUsize>,
}

impl<O: Clone> Sleeper<O> {
    pub fn new(sleep: Duration, value: O, default: O) -> Self {
        Self {
            sleep,
            value,
            default,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn millis(ms: u64, value: O, default: O) -> Self {
        Self::new(Duration::from_millis(ms), value, default)
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl<O> Worker for Sleeper<O>
where
    O: Clone + Send + Sync + 'static,
{
    type Param = ();
    type Output = O;

    fn action(&self, _param: &(), _inputs: &Inputs<'_>) -> Result<O, TaskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.sleep);
        Ok(self.value.clone())
    }

    fn default_value(&self) -> O {
        self.default.clone()
    }
}

/// Blocks for `sleep`, then fails with `message`.
pub struct Failing<O> {
    pub sleep: Duration,
    pub message: &'static str,
    pub default: O,
}

impl<O> Failing<O> {
    pub fn new(message: &'static str, default: O) -> Self {
        Self {
            sleep: Duration::ZERO,
            message,
            default,
        }
    }

    pub fn after(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }
}

impl<O> Worker for Failing<O>
where
    O: Clone + Send + Sync + 'static,
{
    type Param = ();
    type Output = O;

    fn action(&self, _param: &(), _inputs: &Inputs<'_>) -> Result<O, TaskError> {
        std::thread::sleep(self.sleep);
        Err(TaskError::msg(self.message))
    }

    fn default_value(&self) -> O {
        self.default.clone()
    }
}

/// One `Callback::result` notification.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub success: bool,
    pub state: ResultState,
    pub error: Option<String>,
    pub at: Instant,
}

#[derive(Debug, Default)]
pub struct Journal {
    begins: AtomicUsize,
    began_at: Mutex<Option<Instant>>,
    resolutions: Mutex<Vec<Resolution>>,
}

impl Journal {
    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn began_at(&self) -> Option<Instant> {
        *self.began_at.lock()
    }

    pub fn resolutions(&self) -> Vec<Resolution> {
        self.resolutions.lock().clone()
    }

    pub fn resolution_count(&self) -> usize {
        self.resolutions.lock().len()
    }

    /// The only resolution; panics unless exactly one was recorded.
    pub fn single(&self) -> Resolution {
        let resolutions = self.resolutions.lock();
        assert_eq!(
            resolutions.len(),
            1,
            "expected exactly one resolution, got {:?}",
            *resolutions
        );
        resolutions[0].clone()
    }
}

/// Callback recording every notification it receives.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Journal>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Arc<Journal> {
        Arc::clone(&self.0)
    }
}

impl<P, V> Callback<P, V> for Recorder {
    fn begin(&self) {
        self.0.begins.fetch_add(1, Ordering::SeqCst);
        self.0.began_at.lock().get_or_insert_with(Instant::now);
    }

    fn result(&self, success: bool, _param: &P, result: &TaskResult<V>) {
        self.0.resolutions.lock().push(Resolution {
            success,
            state: result.state(),
            error: result.error().map(ToString::to_string),
            at: Instant::now(),
        });
    }
}
