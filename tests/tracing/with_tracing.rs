//! Tests with tracing feature enabled

use taskweave::*;
use taskweave_test::{Failing, Sleeper};

use tracing_subscriber::{fmt, EnvFilter};

use crate::common::ms;

#[test]
fn test_tracing_with_subscriber() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let executor = crate::common::executor();
    let mut graph = TaskGraph::new();
    let a = graph.add_task_with(Sleeper::millis(0, 1, 0), ());
    let b = graph.add_task_with(Failing::new("traced failure", 0), ());
    let c = graph.add_task_with(Sleeper::millis(0, 3, 0), ());
    graph.add_next(a, c).unwrap();
    graph.add_next(b, c).unwrap();
    graph.set_optional(c, [b]).unwrap();

    let report = executor.run(&graph, ms(500), [a, b]).unwrap();

    assert!(report.is_clean());
    assert!(graph.result(c).unwrap().is_success());
    executor.shutdown();
}

#[test]
fn test_tracing_through_controller_timeout() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("taskweave=trace"))
        .with_test_writer()
        .try_init();

    let executor = crate::common::executor();
    let mut graph = TaskGraph::new();
    let slow = graph.add_task_with(Sleeper::millis(200, 1, 0), ());

    let report = executor.run(&graph, ms(20), [slow]).unwrap();

    assert!(report.timed_out());
    executor.shutdown();
}
