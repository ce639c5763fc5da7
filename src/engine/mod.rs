// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the decision engine (pure scheduling core, in [`crate::dag`])
//! - the async runtime loop that dispatches tasks and waits for their
//!   completion events ([`runtime`])
//! - the outer driver that produces repeated graph runs and stops when the
//!   failure breaker trips ([`controller`])

use std::fmt;

use crate::errors::TaskError;
use crate::status::Outcome;
use crate::task::TaskId;
use crate::variables::VariablePool;

pub mod controller;
pub mod runtime;

pub use controller::{Controller, ControllerReport, GraphSource};
pub use runtime::{run_graph, run_graph_with, GraphRuntime};

/// A task's status became terminal.
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    pub task: TaskId,
    pub outcome: Outcome,
}

/// What one graph run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Variable pool at the end of the run, including outputs of every
    /// task that completed before termination.
    pub variables: VariablePool,
    /// Names of successful tasks, in completion order.
    pub completed: Vec<String>,
    /// Names and errors of failed tasks, in completion order.
    pub failed: Vec<(String, TaskError)>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success() {
            write!(f, "ok: {} task(s) completed", self.completed.len())
        } else {
            let failed: Vec<String> = self
                .failed
                .iter()
                .map(|(name, err)| format!("{name} ({err})"))
                .collect();
            write!(
                f,
                "failed: {} task(s) completed, failed: {}",
                self.completed.len(),
                failed.join(", ")
            )
        }
    }
}
