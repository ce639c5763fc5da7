// src/tasks/conditional.rs

use std::fmt;

use tracing::info;

use crate::errors::TaskError;
use crate::task::{BoxFuture, Completion, Task, TaskBody, TaskContext};
use crate::tasks::TransparentTask;
use crate::types::{display_args, Args};

/// Runs one of two tasks depending on a predicate over its arguments.
///
/// The chosen task receives the same arguments. This task finishes with the
/// chosen task's outcome and adopts its results. Without an explicit second
/// task a false predicate runs a task that produces no results, so
/// downstream variables keep their previous values.
pub struct ConditionalTask<P> {
    predicate: P,
    first: Task,
    second: Task,
}

impl<P> ConditionalTask<P>
where
    P: Fn(&Args) -> bool + Send + Sync + 'static,
{
    pub fn new(predicate: P, first: Task, second: Option<Task>) -> Self {
        let second = second.unwrap_or_else(|| Task::new(format!("{} skipped!", first.name()), Skip));
        Self {
            predicate,
            first,
            second,
        }
    }
}

impl<P> fmt::Debug for ConditionalTask<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalTask")
            .field("first", &self.first.name())
            .field("second", &self.second.name())
            .finish_non_exhaustive()
    }
}

impl<P> TaskBody for ConditionalTask<P>
where
    P: Fn(&Args) -> bool + Send + Sync + 'static,
{
    type Input = Args;

    fn organise_inputs(&self, args: Args) -> Result<Args, TaskError> {
        Ok(args)
    }

    fn run<'a>(&'a self, args: Args, ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            let condition = (self.predicate)(&args);
            let chosen = if condition { &self.first } else { &self.second };
            info!(
                task = %ctx.name(),
                condition,
                chosen = %chosen.name(),
                args = %display_args(&args),
                "condition evaluated"
            );

            let status = chosen.execute(args).map_err(TaskError::other)?;
            // Outcome is forwarded below; only the results matter here.
            let _ = status.wait().await;
            ctx.overwrite_results(chosen.results());
            Ok(Completion::Track(status))
        })
    }
}

/// Finishes immediately with no results.
#[derive(Debug, Clone, Copy)]
struct Skip;

impl TaskBody for Skip {
    type Input = ();

    fn organise_inputs(&self, _args: Args) -> Result<(), TaskError> {
        Ok(())
    }

    fn run<'a>(&'a self, _input: (), _ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async { Ok(Completion::Finished) })
    }
}

impl ConditionalTask<fn(&Args) -> bool> {
    /// Pass the arguments through unchanged when `predicate` holds, otherwise
    /// run `task`.
    pub fn unless(predicate: fn(&Args) -> bool, name: &str, task: Task) -> Self {
        let passthrough = Task::new(format!("{name} passthrough"), TransparentTask);
        ConditionalTask::new(predicate, passthrough, Some(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{FnTask, StopTask};
    use crate::types::Value;

    fn doubler() -> Task {
        Task::new(
            "double",
            FnTask::new(|args: Args| {
                let n = args.first().cloned().flatten().and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(vec![Value::Int(n * 2)])
            }),
        )
    }

    #[tokio::test]
    async fn true_branch_results_are_adopted() {
        let body = ConditionalTask::new(|args: &Args| args.len() == 1, doubler(), None);
        let task = Task::new("maybe double", body);
        task.execute(vec![Some(Value::Int(21))]).unwrap().wait().await.unwrap();
        assert_eq!(task.results(), vec![Value::Int(42)]);
    }

    #[tokio::test]
    async fn false_branch_without_second_task_yields_nothing() {
        let body = ConditionalTask::new(|_: &Args| false, doubler(), None);
        let task = Task::new("never", body);
        task.execute(vec![Some(Value::Int(21))]).unwrap().wait().await.unwrap();
        assert!(task.results().is_empty());
    }

    #[tokio::test]
    async fn chosen_failure_is_forwarded() {
        let body = ConditionalTask::new(|_: &Args| false, doubler(), Some(Task::new("stop", StopTask::new("no"))));
        let task = Task::new("branch", body);
        let err = task.execute(Vec::new()).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, TaskError::Stop(_)));
    }

    #[tokio::test]
    async fn unless_passes_arguments_through() {
        fn close_enough(args: &Args) -> bool {
            matches!(args.first(), Some(Some(Value::Float(x))) if *x < 0.1)
        }
        let task = Task::new("refine", ConditionalTask::unless(close_enough, "refine", doubler()));
        task.execute(vec![Some(Value::Float(0.05))]).unwrap().wait().await.unwrap();
        assert_eq!(task.results(), vec![Value::Float(0.05)]);
    }
}
