//! Actions reading predecessor results through Inputs

use taskweave::*;
use taskweave_test::{echo, worker_fn};

use crate::common::{executor, ms};

#[test]
fn test_action_reads_must_predecessors() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let x = graph.add_task_with(echo(0), 10);
    let y = graph.add_task_with(echo(0), 32);
    let sum = graph.add_task_with(
        worker_fn(-1, move |_: &(), inputs: &Inputs<'_>| {
            let a = inputs.get(x).ok_or("x missing")?;
            let b = inputs.get(y).ok_or("y missing")?;
            Ok(a.value() + b.value())
        }),
        (),
    );
    graph.add_next(x, sum).unwrap();
    graph.add_next(y, sum).unwrap();

    executor.run(&graph, ms(500), [x, y]).unwrap();

    assert_eq!(*graph.result(sum).unwrap().value(), 42);
    executor.shutdown();
}

#[test]
fn test_action_sees_its_own_id() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let _padding = graph.add_task_with(echo(0), 0);
    let task = graph.add_task_with(
        worker_fn(usize::MAX, |_: &(), inputs: &Inputs<'_>| {
            Ok(inputs.current().index())
        }),
        (),
    );

    executor.run(&graph, ms(500), [task]).unwrap();

    assert_eq!(*graph.result(task).unwrap().value(), 1);
    executor.shutdown();
}

#[test]
fn test_optional_input_may_be_absent() {
    let executor = executor();
    let mut graph = TaskGraph::new();
    let fast = graph.add_task_with(echo(0), 1);
    let slow = graph.add_task_with(taskweave_test::Sleeper::millis(300, 2, 0), ());
    let merge = graph.add_task_with(
        worker_fn((0, false), move |_: &(), inputs: &Inputs<'_>| {
            let first = inputs.get(fast).map(|r| *r.value()).unwrap_or(0);
            Ok((first, inputs.get(slow).is_some()))
        }),
        (),
    );
    graph.add_next(fast, merge).unwrap();
    graph.add_next(slow, merge).unwrap();
    graph.set_optional(merge, [fast, slow]).unwrap();

    executor.run(&graph, ms(2_000), [fast.id(), slow.id()]).unwrap();

    assert_eq!(*graph.result(merge).unwrap().value(), (1, false));
    executor.shutdown();
}
