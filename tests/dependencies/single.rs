//! Nodes with exactly one predecessor

use taskweave::*;
use taskweave_test::{echo, Failing, Recorder, Sleeper};

use crate::common::{executor, ms};

#[test]
fn test_exception_propagates_down_a_chain() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let recorders: Vec<Recorder> = (0..3).map(|_| Recorder::new()).collect();
    let head = graph.add_task(Failing::new("disk full", 10u8), (), recorders[0].clone());
    let mid = graph.add_task(Sleeper::millis(0, 1u8, 20), (), recorders[1].clone());
    let tail = graph.add_task(Sleeper::millis(0, 2u8, 30), (), recorders[2].clone());
    graph.add_next(head, mid).unwrap();
    graph.add_next(mid, tail).unwrap();

    let report = executor.run(&graph, ms(1_000), [head]).unwrap();
    assert!(report.is_clean());

    for (handle, default) in [(head, 10u8), (mid, 20), (tail, 30)] {
        let result = graph.result(handle).unwrap();
        assert_eq!(result.state(), ResultState::Exception);
        assert_eq!(*result.value(), default);
        assert_eq!(result.error().unwrap().to_string(), "disk full");
    }
    assert_eq!(recorders[0].journal().begins(), 1);
    for recorder in &recorders[1..] {
        let journal = recorder.journal();
        assert_eq!(journal.begins(), 0);
        assert!(!journal.single().success);
    }
    executor.shutdown();
}

#[test]
fn test_root_with_unresolved_single_predecessor_fires() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let never_run = graph.add_task_with(echo(0), 1);
    let started_here = graph.add_task_with(echo(0), 2);
    graph.add_next(never_run, started_here).unwrap();

    executor.run(&graph, ms(500), [started_here]).unwrap();

    assert!(graph.result(started_here).unwrap().is_success());
    assert_eq!(graph.state(never_run).unwrap(), NodeState::Init);
    executor.shutdown();
}
