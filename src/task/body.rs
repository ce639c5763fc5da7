// src/task/body.rs

//! The pluggable part of a task: how raw arguments become a typed input and
//! what running that input does.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::TaskError;
use crate::status::Status;
use crate::types::{Args, Value};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a task body hands its completion back to the task.
#[derive(Debug)]
pub enum Completion {
    /// The body is done; the task finishes successfully.
    Finished,
    /// The task finishes when this status does, with the same outcome.
    Track(Status),
    /// The body arranged for [`TaskContext::status`] to be completed
    /// elsewhere (e.g. by a background worker). If nothing ever completes
    /// it, the task never finishes.
    Deferred,
}

/// Task-specific behaviour.
///
/// `organise_inputs` maps the ordered argument list built by the scheduler
/// onto the body's structured input, filling defaults for missing optional
/// arguments and failing with [`TaskError::MissingArgument`] for missing
/// required ones. `run` performs the work.
///
/// Errors returned from either method, and panics inside `run`, are caught
/// by the task and turned into a failed status.
pub trait TaskBody: Send + Sync + 'static {
    type Input: Send + 'static;

    fn organise_inputs(&self, args: Args) -> Result<Self::Input, TaskError>;

    fn run<'a>(
        &'a self,
        input: Self::Input,
        ctx: TaskContext,
    ) -> BoxFuture<'a, Result<Completion, TaskError>>;
}

/// Object-safe view of a [`TaskBody`], so graphs can hold mixed bodies.
pub(crate) trait ErasedBody: Send + Sync {
    fn start<'a>(
        &'a self,
        args: Args,
        ctx: TaskContext,
    ) -> BoxFuture<'a, Result<Completion, TaskError>>;
}

impl<B: TaskBody> ErasedBody for B {
    fn start<'a>(
        &'a self,
        args: Args,
        ctx: TaskContext,
    ) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            let input = self.organise_inputs(args)?;
            self.run(input, ctx).await
        })
    }
}

/// State shared between a task handle and its running body.
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) results: Mutex<Vec<Value>>,
}

impl Shared {
    pub(crate) fn results(&self) -> MutexGuard<'_, Vec<Value>> {
        self.results.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Handle given to a running body.
#[derive(Clone)]
pub struct TaskContext {
    pub(crate) shared: Arc<Shared>,
    pub(crate) status: Status,
}

impl TaskContext {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The task's own status.
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn add_result(&self, value: impl Into<Value>) {
        self.shared.results().push(value.into());
    }

    /// Replace every result recorded so far.
    pub fn overwrite_results(&self, values: Vec<Value>) {
        *self.shared.results() = values;
    }

    pub fn results(&self) -> Vec<Value> {
        self.shared.results().clone()
    }
}
