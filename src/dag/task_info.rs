// src/dag/task_info.rs

//! Per-run task state and the dispatch record handed to the runtime.

use crate::task::{Task, TaskId};
use crate::types::{display_args, Args};

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on dependencies.
    Pending,
    /// Dispatched; completion not yet observed.
    Running,
    DoneSuccess,
    DoneFailed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::DoneSuccess | RunState::DoneFailed)
    }
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not part of this graph.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// A task the engine wants started now, with its resolved arguments.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub task: Task,
    /// One slot per declared input name, in declaration order.
    pub args: Args,
}

impl ScheduledTask {
    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    pub fn describe(&self) -> String {
        format!("{}{}", self.name(), display_args(&self.args))
    }
}
