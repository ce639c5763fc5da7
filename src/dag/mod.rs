// src/dag/mod.rs

//! Task graphs and the scheduling core.
//!
//! - [`graph`] holds [`TaskGraph`], the composable DAG of tasks with their
//!   input/output bindings.
//! - [`validate`] checks that every input has a source.
//! - [`scheduler`] contains [`DecisionEngine`], the per-run state machine
//!   that decides which tasks are ready and folds their outputs back into
//!   the variable pool.
//! - [`task_info`] provides per-run task states and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;
pub mod validate;

pub use graph::{OutputName, TaskGraph};
pub use scheduler::DecisionEngine;
pub use scheduler_step::SchedulerStep;
pub use task_info::{ScheduledTask, TaskRunState};
pub use validate::check_variables;
