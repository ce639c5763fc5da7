// src/errors.rs

//! Crate-wide error types.
//!
//! - [`TaskgraphError`] is what the library returns to callers (graph
//!   validation, config loading, status misuse, stalled runs).
//! - [`TaskError`] is the error *carried by a failed [`Status`]*. It is
//!   cloneable so every callback on a status can observe it.
//!
//! [`Status`]: crate::status::Status

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskgraphError {
    #[error("Unresolved variables: {}", join_names(.0))]
    UnresolvedVariables(BTreeSet<String>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Task '{task}' has unknown kind '{kind}'")]
    UnknownTaskKind { task: String, kind: String },

    #[error("Status is already done")]
    StatusAlreadyDone,

    #[error("Task already started: {0}")]
    TaskAlreadyStarted(String),

    #[error("Task graph stalled with unfinished tasks: {0:?}")]
    Stalled(Vec<String>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_names(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskgraphError>;

/// Error carried by a failed task status.
///
/// `Stop` and `Fail` are the two *known* outcomes a task body can choose to
/// report. Everything else is unanticipated and is weighted as fatal by the
/// failure tracker.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// Abandon this attempt; the system itself is healthy.
    #[error("task stopped: {0}")]
    Stop(String),

    /// Unsafe to keep retrying.
    #[error("task failed: {0}")]
    Fail(String),

    #[error("missing required argument {position} ({name})")]
    MissingArgument { position: usize, name: &'static str },

    #[error("argument {position} ({name}) should be {expected}, got {found}")]
    InvalidArgument {
        position: usize,
        name: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("task body panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(Arc<anyhow::Error>),
}

impl TaskError {
    pub fn stop(reason: impl Into<String>) -> Self {
        TaskError::Stop(reason.into())
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        TaskError::Fail(reason.into())
    }

    /// Wrap any error as an unanticipated task failure.
    pub fn other(err: impl Into<anyhow::Error>) -> Self {
        TaskError::Other(Arc::new(err.into()))
    }

    /// `Some(fatal)` for the known kinds, `None` for anything unanticipated.
    pub fn fatality(&self) -> Option<bool> {
        match self {
            TaskError::Stop(_) => Some(false),
            TaskError::Fail(_) => Some(true),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(e: anyhow::Error) -> Self {
        TaskError::Other(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_variables_message_lists_names() {
        let names: BTreeSet<String> = ["y".to_string(), "x".to_string()].into();
        let msg = TaskgraphError::UnresolvedVariables(names).to_string();
        assert_eq!(msg, "Unresolved variables: x, y");
    }

    #[test]
    fn only_known_errors_carry_fatality() {
        assert_eq!(TaskError::stop("busy").fatality(), Some(false));
        assert_eq!(TaskError::fail("broken").fatality(), Some(true));
        assert_eq!(TaskError::other(anyhow::anyhow!("boom")).fatality(), None);
        assert_eq!(TaskError::Panicked("oops".into()).fatality(), None);
    }
}
