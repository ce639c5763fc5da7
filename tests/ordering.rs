mod common;

use common::*;
use taskgraph::{run_graph, TaskGraph, VariablePool};

#[tokio::test]
async fn dependencies_complete_before_dependents_start() {
    init_tracing();
    let log = ExecutionLog::new();

    // a -> (b, c) -> d, with b slower than c.
    let a = RecordingTask::new(&log).delay_ms(5).build("a");
    let b = RecordingTask::new(&log).delay_ms(40).build("b");
    let c = RecordingTask::new(&log).delay_ms(5).build("c");
    let d = RecordingTask::new(&log).build("d");

    let middle = TaskGraph::from_task(b.clone()) + TaskGraph::from_task(c.clone());
    let graph = TaskGraph::from_task(d.clone())
        .depends_on(middle.depends_on(TaskGraph::from_task(a.clone())));

    let report = with_timeout(run_graph(graph, VariablePool::new())).await.unwrap();

    assert!(report.success());
    let order = log.order();
    assert_eq!(order.first().map(String::as_str), Some("a"));
    assert_eq!(order.last().map(String::as_str), Some("d"));
    assert_eq!(order.len(), 4);

    // c finishes first even though b and c started together.
    let c_done = report.completed.iter().position(|n| n == "c").unwrap();
    let b_done = report.completed.iter().position(|n| n == "b").unwrap();
    assert!(c_done < b_done);
    assert_eq!(report.completed.last().map(String::as_str), Some("d"));
}

#[tokio::test]
async fn independent_tasks_run_concurrently() {
    let log = ExecutionLog::new();
    let slow: Vec<_> = (0..4)
        .map(|i| RecordingTask::new(&log).delay_ms(100).build(&format!("slow{i}")))
        .collect();

    let graph = slow
        .iter()
        .cloned()
        .map(TaskGraph::from_task)
        .fold(TaskGraph::new(), |acc, g| acc + g);

    let started = std::time::Instant::now();
    let report = with_timeout(run_graph(graph, VariablePool::new())).await.unwrap();

    assert_eq!(report.completed.len(), 4);
    assert!(
        started.elapsed() < std::time::Duration::from_millis(350),
        "tasks should overlap, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn empty_graph_completes_immediately() {
    let report = with_timeout(run_graph(TaskGraph::new(), VariablePool::new())).await.unwrap();
    assert!(report.success());
    assert!(report.completed.is_empty());
}
