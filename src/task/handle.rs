// src/task/handle.rs

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::errors::{Result, TaskError, TaskgraphError};
use crate::status::{Outcome, Status, StatusCallback};
use crate::task::body::{Completion, ErasedBody, Shared, TaskBody, TaskContext};
use crate::types::{display_args, Args, Value};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a task. Names are for humans and may repeat; ids never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_done(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }
}

enum Lifecycle {
    /// Not started; callbacks wait here until a status exists.
    Pending { queued: Vec<StatusCallback> },
    Started(Status),
}

struct TaskCell {
    id: TaskId,
    shared: Arc<Shared>,
    body: Arc<dyn ErasedBody>,
    lifecycle: Mutex<Lifecycle>,
}

/// A named, single-shot unit of work.
///
/// `Task` is a cheap handle: clones share the same underlying task, and
/// equality, ordering and hashing all go by [`TaskId`].
#[derive(Clone)]
pub struct Task {
    cell: Arc<TaskCell>,
}

impl Task {
    pub fn new<B: TaskBody>(name: impl Into<String>, body: B) -> Self {
        let name = name.into();
        Self {
            cell: Arc::new(TaskCell {
                id: TaskId::next(),
                shared: Arc::new(Shared {
                    name,
                    results: Mutex::new(Vec::new()),
                }),
                body: Arc::new(body),
                lifecycle: Mutex::new(Lifecycle::Pending { queued: Vec::new() }),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.cell.id
    }

    pub fn name(&self) -> &str {
        &self.cell.shared.name
    }

    /// The task's status, once it has been started.
    pub fn status(&self) -> Option<Status> {
        match &*self.lifecycle() {
            Lifecycle::Pending { .. } => None,
            Lifecycle::Started(status) => Some(status.clone()),
        }
    }

    pub fn state(&self) -> TaskState {
        match &*self.lifecycle() {
            Lifecycle::Pending { .. } => TaskState::Pending,
            Lifecycle::Started(status) => match status.outcome() {
                None => TaskState::Running,
                Some(Outcome::Finished) => TaskState::Succeeded,
                Some(Outcome::Failed(_)) => TaskState::Failed,
            },
        }
    }

    pub fn is_started(&self) -> bool {
        self.state() != TaskState::Pending
    }

    pub fn is_done(&self) -> bool {
        self.state().is_done()
    }

    /// Register interest in this task's completion.
    ///
    /// Before the task starts the callback is queued and attached to the
    /// status when it is created; afterwards it goes straight onto the
    /// status (and runs immediately if the task is already done).
    pub fn add_complete_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Status) + Send + 'static,
    {
        let mut lifecycle = self.lifecycle();
        match &mut *lifecycle {
            Lifecycle::Pending { queued } => queued.push(Box::new(callback)),
            Lifecycle::Started(status) => {
                let status = status.clone();
                drop(lifecycle);
                status.add_callback(callback);
            }
        }
    }

    /// Start the task body with `args`.
    ///
    /// The status exists (with every queued callback attached) before this
    /// returns; the body itself runs on the tokio runtime. Must be called
    /// from within a tokio runtime.
    pub fn execute(&self, args: Args) -> Result<Status> {
        let status = {
            let mut lifecycle = self.lifecycle();
            let queued = match &mut *lifecycle {
                Lifecycle::Pending { queued } => std::mem::take(queued),
                Lifecycle::Started(_) => {
                    return Err(TaskgraphError::TaskAlreadyStarted(self.name().to_string()));
                }
            };

            let status = Status::named(self.name());
            for callback in queued {
                status.add_boxed_callback(callback);
            }
            *lifecycle = Lifecycle::Started(status.clone());
            status
        };

        info!(task = %self.name(), id = %self.id(), "task started");
        debug!(task = %self.name(), args = %display_args(&args), "task arguments");

        let body = Arc::clone(&self.cell.body);
        let ctx = TaskContext {
            shared: Arc::clone(&self.cell.shared),
            status: status.clone(),
        };
        let name = self.name().to_string();
        let task_status = status.clone();

        tokio::spawn(async move {
            let run = tokio::spawn(async move { body.start(args, ctx).await });

            let settled = match run.await {
                Ok(Ok(Completion::Finished)) => {
                    info!(task = %name, "task finished");
                    task_status.set_finished()
                }
                Ok(Ok(Completion::Track(other))) => {
                    debug!(task = %name, "task tracking another status");
                    task_status.track(&other);
                    Ok(())
                }
                Ok(Ok(Completion::Deferred)) => {
                    debug!(task = %name, "task completion deferred to its body");
                    Ok(())
                }
                Ok(Err(err)) => {
                    warn!(task = %name, error = %err, "task body returned an error");
                    task_status.set_exception(err)
                }
                Err(join_err) => {
                    let message = panic_message(join_err);
                    error!(task = %name, panic = %message, "task body panicked");
                    task_status.set_exception(TaskError::Panicked(message))
                }
            };

            if settled.is_err() {
                debug!(task = %name, "task status was already done when its body returned");
            }
        });

        Ok(status)
    }

    /// Map output names onto results, position by position.
    ///
    /// `None` names skip that position; results past the end of `names` are
    /// dropped.
    pub fn get_results<S: AsRef<str>>(&self, names: &[Option<S>]) -> HashMap<String, Value> {
        let results = self.cell.shared.results();
        names
            .iter()
            .zip(results.iter())
            .filter_map(|(name, value)| {
                name.as_ref()
                    .map(|n| (n.as_ref().to_string(), value.clone()))
            })
            .collect()
    }

    /// Snapshot of every result recorded so far.
    pub fn results(&self) -> Vec<Value> {
        self.cell.shared.results().clone()
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.cell.lifecycle.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "task body was cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state() {
            TaskState::Pending => write!(f, "{}: Not Started", self.name()),
            TaskState::Running => write!(f, "{}: Started", self.name()),
            TaskState::Succeeded => {
                let results: Vec<String> = self.results().iter().map(ToString::to_string).collect();
                write!(f, "{} Complete: [{}]", self.name(), results.join(", "))
            }
            TaskState::Failed => write!(f, "{}: Failed", self.name()),
        }
    }
}
