// src/task/mod.rs

//! Tasks: named, stateful units of schedulable work.
//!
//! - [`handle`] holds [`Task`], the shared handle the graph and scheduler
//!   work with, and its lifecycle ([`TaskState`]).
//! - [`body`] defines the [`TaskBody`] trait implemented by concrete task
//!   behaviour, plus the [`TaskContext`] a running body writes results to.
//! - [`args`] provides [`ArgReader`] for `organise_inputs`.

pub mod args;
pub mod body;
pub mod handle;

pub use args::ArgReader;
pub use body::{BoxFuture, Completion, TaskBody, TaskContext};
pub use handle::{Task, TaskId, TaskState};
