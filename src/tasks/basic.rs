// src/tasks/basic.rs

use std::fmt;

use crate::errors::TaskError;
use crate::task::{ArgReader, BoxFuture, Completion, TaskBody, TaskContext};
use crate::types::{Args, Value};

/// Body built from a closure mapping arguments to results.
pub struct FnTask<F> {
    func: F,
}

impl<F> FnTask<F>
where
    F: Fn(Args) -> Result<Vec<Value>, TaskError> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for FnTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask").finish_non_exhaustive()
    }
}

impl<F> TaskBody for FnTask<F>
where
    F: Fn(Args) -> Result<Vec<Value>, TaskError> + Send + Sync + 'static,
{
    type Input = Args;

    fn organise_inputs(&self, args: Args) -> Result<Args, TaskError> {
        Ok(args)
    }

    fn run<'a>(&'a self, input: Args, ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            for value in (self.func)(input)? {
                ctx.add_result(value);
            }
            Ok(Completion::Finished)
        })
    }
}

/// Results are the inputs, in order. Absent inputs are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransparentTask;

impl TaskBody for TransparentTask {
    type Input = Args;

    fn organise_inputs(&self, args: Args) -> Result<Args, TaskError> {
        Ok(args)
    }

    fn run<'a>(&'a self, input: Args, ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            ctx.overwrite_results(input.into_iter().flatten().collect());
            Ok(Completion::Finished)
        })
    }
}

/// Always fails with [`TaskError::Stop`]. An optional string argument
/// replaces the reason.
#[derive(Debug, Clone)]
pub struct StopTask {
    reason: String,
}

impl StopTask {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TaskBody for StopTask {
    type Input = String;

    fn organise_inputs(&self, args: Args) -> Result<String, TaskError> {
        let reader = ArgReader::new(args);
        Ok(reader
            .optional_str(0, "reason")?
            .unwrap_or_else(|| self.reason.clone()))
    }

    fn run<'a>(&'a self, reason: String, _ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move { Err(TaskError::Stop(reason)) })
    }
}

/// Always fails with [`TaskError::Fail`]. An optional string argument
/// replaces the reason.
#[derive(Debug, Clone)]
pub struct FailTask {
    reason: String,
}

impl FailTask {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TaskBody for FailTask {
    type Input = String;

    fn organise_inputs(&self, args: Args) -> Result<String, TaskError> {
        let reader = ArgReader::new(args);
        Ok(reader
            .optional_str(0, "reason")?
            .unwrap_or_else(|| self.reason.clone()))
    }

    fn run<'a>(&'a self, reason: String, _ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move { Err(TaskError::Fail(reason)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[tokio::test]
    async fn transparent_task_returns_present_inputs() {
        let task = Task::new("pass", TransparentTask);
        let status = task.execute(vec![Some(Value::Int(1)), None, Some("x".into())]).unwrap();
        status.wait().await.unwrap();
        assert_eq!(task.results(), vec![Value::Int(1), Value::from("x")]);
    }

    #[tokio::test]
    async fn fn_task_errors_fail_the_status() {
        let task = Task::new(
            "strict",
            FnTask::new(|args: Args| {
                let reader = ArgReader::new(args);
                let n = reader.required(0, "n")?.clone();
                Ok(vec![n])
            }),
        );
        let err = task.execute(Vec::new()).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, TaskError::MissingArgument { position: 0, name: "n" }));
    }

    #[tokio::test]
    async fn stop_and_fail_carry_their_kind() {
        let stop = Task::new("stop", StopTask::new("busy"));
        let err = stop.execute(Vec::new()).unwrap().wait().await.unwrap_err();
        assert_eq!(err.fatality(), Some(false));

        let fail = Task::new("fail", FailTask::new("broken"));
        let err = fail
            .execute(vec![Some("overridden".into())])
            .unwrap()
            .wait()
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Fail(reason) if reason == "overridden"));
    }
}
