// src/tasks/mod.rs

//! Built-in task bodies.
//!
//! These cover the generic behaviours a graph needs around the real work:
//! closures, pauses, run markers, pass-through, branching, deliberate
//! failures and waiting on groups of concurrent operations.

pub mod basic;
pub mod conditional;
pub mod run;
pub mod timing;

pub use basic::{FailTask, FnTask, StopTask, TransparentTask};
pub use conditional::ConditionalTask;
pub use run::{CloseRunTask, OpenRunTask, RUN_ID};
pub use timing::{GroupedSleepTask, SleepTask, WaitGroupTask};

use crate::dag::TaskGraph;
use crate::task::Task;

/// Bracket `graph` with a run: every task depends on a new [`OpenRunTask`]
/// (output `run_id`) and a new [`CloseRunTask`] (input `run_id`) depends on
/// every task.
pub fn wrap_in_run(graph: TaskGraph) -> TaskGraph {
    let open = OpenRunTask::new();
    let open_name = format!("Open Run {}", open.run_id());
    let open = TaskGraph::node(Task::new(open_name, open), Vec::<String>::new(), [RUN_ID]);
    let close = TaskGraph::node(Task::new("Close Run", CloseRunTask::new()), [RUN_ID], Vec::<String>::new());

    graph.depends_on(open).is_depended_on_by(close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_in_run_brackets_every_task() {
        let body = Task::new("body", TransparentTask);
        let graph = wrap_in_run(TaskGraph::from_task(body.clone()));
        assert_eq!(graph.len(), 3);

        let open = graph
            .tasks()
            .find(|t| t.name().starts_with("Open Run"))
            .cloned()
            .unwrap();
        let close = graph.tasks().find(|t| t.name() == "Close Run").cloned().unwrap();

        let body_deps: Vec<_> = graph.dependencies_of(body.id()).collect();
        assert_eq!(body_deps, vec![open.id()]);
        let close_deps: std::collections::BTreeSet<_> = graph.dependencies_of(close.id()).collect();
        assert!(close_deps.contains(&body.id()) && close_deps.contains(&open.id()));
        assert_eq!(graph.outputs_of(open.id()), [Some(RUN_ID.to_string())]);
        assert_eq!(graph.inputs_of(close.id()), [RUN_ID.to_string()]);
    }
}
