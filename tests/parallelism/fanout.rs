//! Tests for fan-out speedup and join-before-return

use std::time::Instant;

use taskweave::*;
use taskweave_test::{echo, Recorder, Sleeper};

use crate::common::{executor, init_tracing, ms};

#[test]
fn test_two_branches_run_side_by_side() {
    init_tracing();
    let executor = executor();
    let mut graph = TaskGraph::new();
    let left_recorder = Recorder::new();
    let right_recorder = Recorder::new();
    let root = graph.add_task_with(echo(0), 0);
    let left = graph.add_task(Sleeper::millis(1_000, 1, 0), (), left_recorder.clone());
    let right = graph.add_task(Sleeper::millis(1_000, 2, 0), (), right_recorder.clone());
    graph.add_nexts(root, [left, right]).unwrap();

    let start = Instant::now();
    let report = executor.run(&graph, ms(5_000), [root]).unwrap();
    let elapsed = start.elapsed();

    assert!(report.is_clean());
    assert!(left_recorder.journal().single().success);
    assert!(right_recorder.journal().single().success);

    println!("two 1000ms branches took {:?}", elapsed);
    assert!(elapsed >= ms(1_000));
    assert!(elapsed < ms(1_800), "branches ran sequentially: {:?}", elapsed);
    executor.shutdown();
}

#[test]
fn test_wide_fan_out_is_bounded_by_the_slowest_branch() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let root = graph.add_task_with(echo(0), 0);
    let branches: Vec<_> = (0..8)
        .map(|i| graph.add_task_with(Sleeper::millis(100 + i * 10, i, 0), ()))
        .collect();
    graph.add_nexts(root, branches.iter()).unwrap();

    let report = executor.run(&graph, ms(5_000), [root]).unwrap();

    assert!(report.is_clean());
    assert!(report.elapsed() < ms(8 * 100));
    for (i, handle) in branches.iter().enumerate() {
        assert_eq!(*graph.result(*handle).unwrap().value(), i as u64);
    }
    executor.shutdown();
}

#[test]
fn test_join_returns_only_after_every_sub_tree() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let root = graph.add_task_with(echo(0), 0);
    let mut leaves = Vec::new();
    for branch in 0..4u64 {
        let head = graph.add_task_with(Sleeper::millis(20, branch, 0), ());
        graph.add_next(root, head).unwrap();
        let mut previous = head;
        for depth in 0..5u64 {
            let next = graph.add_task_with(Sleeper::millis(10 * (branch % 2), depth, 0), ());
            graph.add_next(previous, next).unwrap();
            previous = next;
        }
        leaves.push(previous);
    }

    let report = executor.run(&graph, ms(5_000), [root]).unwrap();

    assert!(report.is_clean());
    for leaf in leaves {
        assert_eq!(graph.state(leaf).unwrap(), NodeState::Finish);
    }
    executor.shutdown();
}

#[test]
fn test_fan_out_wider_than_the_pool_completes() {
    let executor = Executor::with_config(ExecutorConfig {
        worker_threads: 2,
        ..ExecutorConfig::default()
    })
    .unwrap();
    let mut graph = TaskGraph::new();
    let root = graph.add_task_with(echo(0), 0);
    let branches: Vec<_> = (0..16)
        .map(|_| graph.add_task_with(Sleeper::millis(10, 1u8, 0), ()))
        .collect();
    graph.add_nexts(root, &branches).unwrap();

    let report = executor.run(&graph, ms(5_000), [root]).unwrap();

    assert!(report.is_clean());
    assert!(branches
        .iter()
        .all(|handle| graph.result(*handle).unwrap().is_success()));
    executor.shutdown();
}
