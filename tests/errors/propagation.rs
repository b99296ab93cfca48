//! Exceptions recorded as results and handed to dependents

use std::time::Instant;

use taskweave::*;
use taskweave_test::{worker_fn, Failing, Recorder, Sleeper};

use crate::common::{executor, init_tracing, ms};

#[test]
fn test_partial_must_failure_fails_without_waiting() {
    init_tracing();
    let executor = executor();
    let mut graph = TaskGraph::new();
    let b_recorder = Recorder::new();
    let c_recorder = Recorder::new();
    let a = graph.add_task_with(Failing::new("a exploded", 0).after(ms(50)), ());
    let b = graph.add_task(Sleeper::millis(600, 2, 0), (), b_recorder.clone());
    let c = graph.add_task(Sleeper::millis(0, 3, -3), (), c_recorder.clone());
    graph.add_next(a, c).unwrap();
    graph.add_next(b, c).unwrap();

    let start = Instant::now();
    executor.run(&graph, ms(5_000), [a, b]).unwrap();

    let c_resolution = c_recorder.journal().single();
    let b_resolution = b_recorder.journal().single();
    assert_eq!(c_resolution.state, ResultState::Exception);
    assert_eq!(c_resolution.error.as_deref(), Some("a exploded"));
    assert!(c_resolution.at < b_resolution.at);
    assert!(c_resolution.at.duration_since(start) < ms(400));
    assert_eq!(c_recorder.journal().begins(), 0);

    let result = graph.result(c).unwrap();
    assert_eq!(*result.value(), -3);
    assert!(graph.result(b).unwrap().is_success());
    executor.shutdown();
}

#[derive(Debug)]
struct QuotaExceeded {
    used: u32,
}

impl std::fmt::Display for QuotaExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "quota exceeded after {} calls", self.used)
    }
}

impl std::error::Error for QuotaExceeded {}

#[test]
fn test_typed_error_is_shared_with_dependents() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let source = graph.add_task_with(
        worker_fn(0u32, |_: &(), _: &Inputs<'_>| {
            Err(TaskError::new(QuotaExceeded { used: 3 }))
        }),
        (),
    );
    let dependent = graph.add_task_with(Sleeper::millis(0, 1u32, 0), ());
    graph.add_next(source, dependent).unwrap();

    executor.run(&graph, ms(1_000), [source]).unwrap();

    let original = graph.result(source).unwrap();
    let inherited = graph.result(dependent).unwrap();
    assert_eq!(inherited.state(), ResultState::Exception);
    assert_eq!(
        inherited.error().unwrap().to_string(),
        "quota exceeded after 3 calls"
    );
    match (original.error().unwrap(), inherited.error().unwrap()) {
        (TaskError::Action(a), TaskError::Action(b)) => {
            assert!(std::sync::Arc::ptr_eq(a, b));
            assert!(a.downcast_ref::<QuotaExceeded>().is_some());
        }
        other => panic!("expected action errors, got {:?}", other),
    }
    executor.shutdown();
}

#[test]
fn test_action_panic_becomes_exception() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let recorder = Recorder::new();
    let bad = graph.add_task(
        worker_fn(0u8, |_: &(), _: &Inputs<'_>| -> Result<u8, TaskError> {
            panic!("index out of range")
        }),
        (),
        recorder.clone(),
    );
    let next = graph.add_task_with(Sleeper::millis(0, 1u8, 9), ());
    graph.add_next(bad, next).unwrap();

    let report = executor.run(&graph, ms(1_000), [bad]).unwrap();

    assert!(report.is_clean());
    let result = graph.result(bad).unwrap();
    assert_eq!(result.state(), ResultState::Exception);
    assert!(result.error().unwrap().is_panic());
    assert!(recorder
        .journal()
        .single()
        .error
        .unwrap()
        .contains("index out of range"));
    assert_eq!(*graph.result(next).unwrap().value(), 9);
    assert!(graph.result(next).unwrap().error().unwrap().is_panic());
    executor.shutdown();
}

#[test]
fn test_failure_does_not_stall_unrelated_branches() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let root = graph.add_task_with(Sleeper::millis(0, 0, 0), ());
    let failing = graph.add_task_with(Failing::new("branch failed", 0), ());
    let after_failing = graph.add_task_with(Sleeper::millis(0, 1, 0), ());
    let healthy = graph.add_task_with(Sleeper::millis(50, 2, 0), ());
    let after_healthy = graph.add_task_with(Sleeper::millis(0, 3, 0), ());
    graph.add_nexts(root, [failing, healthy]).unwrap();
    graph.add_next(failing, after_failing).unwrap();
    graph.add_next(healthy, after_healthy).unwrap();

    let report = executor.run(&graph, ms(1_000), [root]).unwrap();

    assert!(report.is_clean());
    assert_eq!(
        graph.result(after_failing).unwrap().state(),
        ResultState::Exception
    );
    assert_eq!(*graph.result(after_healthy).unwrap().value(), 3);
    executor.shutdown();
}
