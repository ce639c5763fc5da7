// src/tasks/run.rs

//! Run markers: open a run, hand its id downstream, close it again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::errors::TaskError;
use crate::task::{ArgReader, BoxFuture, Completion, TaskBody, TaskContext};
use crate::types::{Args, Value};

/// Conventional variable name for the current run id.
pub const RUN_ID: &str = "run_id";

static RUN_COUNTER: AtomicU64 = AtomicU64::new(1);

fn generate_run_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let n = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{millis:x}-{n}")
}

/// Opens a run. Its single result is the run id.
///
/// Accepts one optional argument: run metadata, logged with the open.
#[derive(Debug, Clone)]
pub struct OpenRunTask {
    run_id: String,
}

impl OpenRunTask {
    /// A run with a generated id.
    pub fn new() -> Self {
        Self::with_run_id(generate_run_id())
    }

    /// A run with a human-readable id known up front.
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Default for OpenRunTask {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBody for OpenRunTask {
    type Input = Option<Value>;

    fn organise_inputs(&self, args: Args) -> Result<Option<Value>, TaskError> {
        Ok(ArgReader::new(args).optional(0).cloned())
    }

    fn run<'a>(&'a self, metadata: Option<Value>, ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            match &metadata {
                Some(md) => info!(run_id = %self.run_id, metadata = %md, "run opened"),
                None => info!(run_id = %self.run_id, "run opened"),
            }
            ctx.overwrite_results(vec![Value::from(self.run_id.as_str())]);
            Ok(Completion::Finished)
        })
    }
}

/// Closes a run. Its single result is the run id that was closed.
///
/// Arguments: run id (required unless fixed at construction), optional
/// exit status, optional reason.
#[derive(Debug, Clone, Default)]
pub struct CloseRunTask {
    run_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CloseRunInput {
    pub run_id: String,
    pub exit_status: Option<String>,
    pub reason: Option<String>,
}

impl CloseRunTask {
    /// Close whatever run id arrives as the first argument.
    pub fn new() -> Self {
        Self { run_id: None }
    }

    /// Close a run known up front.
    pub fn for_run(run_id: impl Into<String>) -> Self {
        Self {
            run_id: Some(run_id.into()),
        }
    }
}

impl TaskBody for CloseRunTask {
    type Input = CloseRunInput;

    fn organise_inputs(&self, args: Args) -> Result<CloseRunInput, TaskError> {
        let reader = ArgReader::new(args);
        let run_id = match (&self.run_id, reader.optional_str(0, RUN_ID)?) {
            (_, Some(id)) => id,
            (Some(fixed), None) => fixed.clone(),
            (None, None) => {
                return Err(TaskError::MissingArgument {
                    position: 0,
                    name: RUN_ID,
                });
            }
        };

        Ok(CloseRunInput {
            run_id,
            exit_status: reader.optional_str(1, "exit_status")?,
            reason: reader.optional_str(2, "reason")?,
        })
    }

    fn run<'a>(&'a self, input: CloseRunInput, ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            info!(
                run_id = %input.run_id,
                exit_status = input.exit_status.as_deref().unwrap_or("<default>"),
                reason = input.reason.as_deref().unwrap_or(""),
                "run closed"
            );
            ctx.overwrite_results(vec![Value::from(input.run_id)]);
            Ok(Completion::Finished)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(OpenRunTask::new().run_id(), OpenRunTask::new().run_id());
    }

    #[tokio::test]
    async fn close_requires_a_run_id() {
        let close = Task::new("close", CloseRunTask::new());
        let err = close.execute(vec![None]).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, TaskError::MissingArgument { name: RUN_ID, .. }));

        let fixed = Task::new("close fixed", CloseRunTask::for_run("r1"));
        fixed.execute(Vec::new()).unwrap().wait().await.unwrap();
        assert_eq!(fixed.results(), vec![Value::from("r1")]);
    }

    #[tokio::test]
    async fn open_reports_its_id() {
        let body = OpenRunTask::with_run_id("scan-1");
        let open = Task::new("open", body);
        open.execute(Vec::new()).unwrap().wait().await.unwrap();
        assert_eq!(open.results(), vec![Value::from("scan-1")]);
    }
}
