#![allow(dead_code)]

pub use taskgraph_test_utils::builders::{
    ConfigFileBuilder, ExecutionLog, RecordingTask, TaskConfigBuilder,
};
pub use taskgraph_test_utils::{init_tracing, with_timeout};

use taskgraph::TaskGraph;
use taskgraph::task::Task;

/// Single-task graph with the given bindings.
pub fn node(task: &Task, inputs: &[&str], outputs: &[&str]) -> TaskGraph {
    TaskGraph::node(
        task.clone(),
        inputs.iter().copied(),
        outputs.iter().copied(),
    )
}
