// src/dag/scheduler_step.rs

//! Step-by-step result types for the decision engine.

use crate::dag::task_info::ScheduledTask;

/// Structured result of handling one completion.
///
/// Useful for tests that step the engine by hand and make assertions about
/// what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready as a result of this step. They are already
    /// marked as dispatched.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Names of tasks newly marked as failed in this step.
    pub newly_failed: Vec<String>,
    /// Whether this step made the run complete.
    pub run_just_finished: bool,
}
