mod common;

use std::collections::BTreeSet;

use common::*;
use taskgraph::{run_graph, TaskGraph, TaskgraphError, VariablePool};

#[tokio::test]
async fn unresolved_inputs_are_rejected_before_anything_runs() {
    let log = ExecutionLog::new();
    let producer = RecordingTask::new(&log).build("producer");
    let consumer = RecordingTask::new(&log).build("consumer");

    let graph = node(&consumer, &["x", "y"], &[]).depends_on(node(&producer, &[], &["x"]));

    let err = run_graph(graph, VariablePool::new()).await.unwrap_err();
    match err {
        TaskgraphError::UnresolvedVariables(names) => {
            assert_eq!(names, BTreeSet::from(["y".to_string()]));
        }
        other => panic!("expected UnresolvedVariables, got {other:?}"),
    }
    assert!(log.order().is_empty());
    assert!(!producer.is_started());
}

#[tokio::test]
async fn pool_values_satisfy_inputs() {
    let log = ExecutionLog::new();
    let consumer = RecordingTask::new(&log).build("consumer");
    let graph = node(&consumer, &["y"], &[]);
    let pool: VariablePool = [("y", "given")].into_iter().collect();

    let report = with_timeout(run_graph(graph, pool)).await.unwrap();
    assert!(report.success());
}

#[tokio::test]
async fn dependency_cycle_stalls() {
    let log = ExecutionLog::new();
    let a = RecordingTask::new(&log).build("a");
    let b = RecordingTask::new(&log).build("b");

    let mut graph = TaskGraph::new();
    graph.add_task(a.clone(), [&b]);
    graph.add_task(b.clone(), [&a]);
    assert!(matches!(graph.check_acyclic(), Err(TaskgraphError::DagCycle(_))));

    let err = with_timeout(run_graph(graph, VariablePool::new())).await.unwrap_err();
    match err {
        TaskgraphError::Stalled(stuck) => assert_eq!(stuck, vec!["a", "b"]),
        other => panic!("expected Stalled, got {other:?}"),
    }
    assert!(log.order().is_empty());
}

#[tokio::test]
async fn task_already_started_elsewhere_fails_the_run() {
    let log = ExecutionLog::new();
    let used = RecordingTask::new(&log).build("used");
    let status = used.execute(Vec::new()).unwrap();
    status.wait().await.unwrap();

    let report = with_timeout(run_graph(TaskGraph::from_task(used), VariablePool::new()))
        .await
        .unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "used");
}
