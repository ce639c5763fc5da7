mod common;

use common::*;
use taskgraph::engine::Controller;
use taskgraph::errors::Result;
use taskgraph::task::Task;
use taskgraph::tasks::{FailTask, StopTask};
use taskgraph::{FailureTracker, TaskGraph, Value, VariablePool};

#[tokio::test]
async fn repeated_stops_trip_the_breaker() {
    init_tracing();
    let source = |_known: &VariablePool| -> Result<TaskGraph> {
        Ok(TaskGraph::from_task(Task::new("busy", StopTask::new("beamline busy"))))
    };
    let mut controller =
        Controller::new(source, VariablePool::new()).with_tracker(FailureTracker::new(3));

    let report = with_timeout(controller.run_task_graphs(Some(10))).await.unwrap();

    assert!(report.suspended);
    assert_eq!(report.runs_attempted(), 3);
    assert!(controller.tripped());
    assert_eq!(controller.tracker().map(FailureTracker::current_signal), Some(3));
}

#[tokio::test]
async fn a_fatal_failure_trips_after_one_run() {
    let source = |_known: &VariablePool| -> Result<TaskGraph> {
        Ok(TaskGraph::from_task(Task::new("crash", FailTask::new("motor stuck"))))
    };
    let mut controller =
        Controller::new(source, VariablePool::new()).with_tracker(FailureTracker::new(3));

    let report = with_timeout(controller.run_task_graphs(None)).await.unwrap();
    assert!(report.suspended);
    assert_eq!(report.runs_attempted(), 1);

    controller.resume();
    assert!(!controller.tripped());

    let again = with_timeout(controller.run_task_graphs(None)).await.unwrap();
    assert_eq!(again.runs_attempted(), 1);
    assert!(controller.tripped());
}

#[tokio::test]
async fn successful_runs_stop_at_the_run_limit() {
    let log = ExecutionLog::new();
    let source_log = log.clone();
    let source = move |known: &VariablePool| -> Result<TaskGraph> {
        let task = RecordingTask::new(&source_log)
            .results(vec![Value::from("measured")])
            .build("measure");
        assert!(!known.contains("result"), "outputs leaked between runs");
        Ok(node(&task, &["sample"], &["result"]))
    };
    let mut controller = Controller::new(source, [("sample", "lysozyme")].into_iter().collect())
        .with_tracker(FailureTracker::new(2));

    let report = with_timeout(controller.run_task_graphs(Some(3))).await.unwrap();

    assert!(!report.suspended);
    assert_eq!(report.runs_attempted(), 3);
    assert!(report.runs.iter().all(|r| r.success()));
    assert_eq!(
        report.runs[0].variables.get("result"),
        Some(&Value::from("measured"))
    );
    assert_eq!(controller.get("result"), None);
    assert_eq!(log.order().len(), 3);
}

#[tokio::test]
async fn without_a_tracker_only_one_run_happens() {
    let source = |_known: &VariablePool| -> Result<TaskGraph> {
        Ok(TaskGraph::from_task(Task::new("busy", StopTask::new("busy"))))
    };
    let mut controller = Controller::new(source, VariablePool::new());

    let report = with_timeout(controller.run_task_graphs(Some(5))).await.unwrap();
    assert_eq!(report.runs_attempted(), 1);
    assert!(!report.suspended);
    assert!(!report.runs[0].success());
}

#[tokio::test]
async fn known_values_can_be_added_and_removed() {
    let source = |_known: &VariablePool| -> Result<TaskGraph> { Ok(TaskGraph::new()) };
    let mut controller = Controller::new(source, VariablePool::new());

    controller.add_value("sample", "thaumatin");
    controller.add_value("offset", 0.5);
    controller.add_values([("beam", Value::Bool(true))]);
    assert_eq!(controller.known_values().len(), 3);

    // By value first.
    controller.remove_value("thaumatin");
    assert_eq!(controller.get("sample"), None);

    // Falls back to the name when no entry holds the string.
    controller.remove_value("offset");
    assert_eq!(controller.get("offset"), None);
    assert_eq!(controller.get("beam"), Some(&Value::Bool(true)));
}
