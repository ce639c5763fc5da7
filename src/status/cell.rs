// src/status/cell.rs

//! Single-assignment completion cell with callback notification.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::errors::{Result, TaskError, TaskgraphError};

/// Callback fired exactly once when a [`Status`] becomes terminal.
pub type StatusCallback = Box<dyn FnOnce(&Status) + Send + 'static>;

/// Terminal outcome of a [`Status`].
#[derive(Debug, Clone)]
pub enum Outcome {
    Finished,
    Failed(TaskError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Finished)
    }

    pub fn into_result(self) -> std::result::Result<(), TaskError> {
        match self {
            Outcome::Finished => Ok(()),
            Outcome::Failed(err) => Err(err),
        }
    }
}

#[derive(Default)]
struct State {
    outcome: Option<Outcome>,
    callbacks: Vec<StatusCallback>,
}

/// Bookkeeping for a conjunctive status.
struct Conjunction {
    children: Vec<Status>,
    progress: Mutex<ConjunctionProgress>,
}

struct ConjunctionProgress {
    outstanding: usize,
    first_error: Option<TaskError>,
}

struct Inner {
    label: Option<String>,
    state: Mutex<State>,
    conjunction: Option<Conjunction>,
}

/// Observable outcome of one asynchronous operation.
///
/// A `Status` is a cheap, cloneable handle; all clones observe the same
/// cell. At most one terminal transition is accepted, and every callback
/// registered on the cell runs exactly once, in registration order, on the
/// thread that performed the transition. Callbacks added after the
/// transition run immediately on the caller's thread.
#[derive(Clone)]
pub struct Status {
    inner: Arc<Inner>,
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// A status whose label shows up in logs and `Debug` output.
    pub fn named(label: impl Into<String>) -> Self {
        Self::build(Some(label.into()), None)
    }

    /// A status that is already finished.
    pub fn finished() -> Self {
        let status = Self::new();
        status.complete(Outcome::Finished).ok();
        status
    }

    /// Conjunction of several statuses.
    ///
    /// Done once every child is done; successful only if every child
    /// succeeded. A failed conjunction carries the error of the first child
    /// observed to fail. An empty set is finished immediately.
    pub fn all(children: impl IntoIterator<Item = Status>) -> Self {
        let children: Vec<Status> = children.into_iter().collect();
        if children.is_empty() {
            return Self::finished();
        }

        let conjunction = Conjunction {
            progress: Mutex::new(ConjunctionProgress {
                outstanding: children.len(),
                first_error: None,
            }),
            children: children.clone(),
        };
        let status = Self::build(None, Some(conjunction));

        for child in children {
            let parent = status.clone();
            child.add_callback(move |c| parent.child_done(c));
        }

        status
    }

    fn build(label: Option<String>, conjunction: Option<Conjunction>) -> Self {
        Self {
            inner: Arc::new(Inner {
                label,
                state: Mutex::new(State::default()),
                conjunction,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Callbacks never run under this lock.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Child statuses if this is a conjunction, otherwise empty.
    pub fn children(&self) -> &[Status] {
        self.inner
            .conjunction
            .as_ref()
            .map(|c| c.children.as_slice())
            .unwrap_or(&[])
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Status) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn done(&self) -> bool {
        self.state().outcome.is_some()
    }

    pub fn success(&self) -> bool {
        matches!(self.state().outcome, Some(Outcome::Finished))
    }

    /// The carried error if this status failed.
    pub fn exception(&self) -> Option<TaskError> {
        match &self.state().outcome {
            Some(Outcome::Failed(err)) => Some(err.clone()),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.state().outcome.clone()
    }

    /// Register a callback for the terminal transition.
    ///
    /// If the status is already terminal the callback runs immediately.
    pub fn add_callback<F>(&self, callback: F)
    where
        F: FnOnce(&Status) + Send + 'static,
    {
        self.add_boxed_callback(Box::new(callback));
    }

    pub fn add_boxed_callback(&self, callback: StatusCallback) {
        let mut state = self.state();
        if state.outcome.is_none() {
            state.callbacks.push(callback);
            return;
        }
        drop(state);
        callback(self);
    }

    pub fn set_finished(&self) -> Result<()> {
        self.complete(Outcome::Finished)
    }

    pub fn set_exception(&self, err: TaskError) -> Result<()> {
        self.complete(Outcome::Failed(err))
    }

    /// Mirror another status's terminal outcome onto this one.
    pub fn track(&self, other: &Status) {
        let this = self.clone();
        other.add_callback(move |tracked| {
            let outcome = tracked
                .outcome()
                .unwrap_or(Outcome::Failed(TaskError::fail("tracked status fired without outcome")));
            if this.complete(outcome).is_err() {
                debug!(
                    status = this.label().unwrap_or("<unnamed>"),
                    "tracked status finished after this status was already done; ignoring"
                );
            }
        });
    }

    /// Wait for the terminal outcome.
    pub async fn wait(&self) -> std::result::Result<(), TaskError> {
        let (tx, rx) = oneshot::channel();
        self.add_callback(move |status| {
            let _ = tx.send(status.outcome());
        });

        match rx.await {
            Ok(Some(outcome)) => outcome.into_result(),
            _ => Err(TaskError::fail("status dropped before completing")),
        }
    }

    fn complete(&self, outcome: Outcome) -> Result<()> {
        let callbacks = {
            let mut state = self.state();
            if state.outcome.is_some() {
                return Err(TaskgraphError::StatusAlreadyDone);
            }
            trace!(
                status = self.label().unwrap_or("<unnamed>"),
                success = outcome.is_success(),
                "status became terminal"
            );
            state.outcome = Some(outcome);
            std::mem::take(&mut state.callbacks)
        };

        for callback in callbacks {
            callback(self);
        }

        Ok(())
    }

    fn child_done(&self, child: &Status) {
        let Some(conjunction) = self.inner.conjunction.as_ref() else {
            return;
        };

        let finished = {
            let mut progress = conjunction
                .progress
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(err) = child.exception() {
                progress.first_error.get_or_insert(err);
            }
            progress.outstanding = progress.outstanding.saturating_sub(1);
            if progress.outstanding == 0 {
                Some(match progress.first_error.take() {
                    Some(err) => Outcome::Failed(err),
                    None => Outcome::Finished,
                })
            } else {
                None
            }
        };

        if let Some(outcome) = finished {
            self.complete(outcome).ok();
        }
    }
}

impl fmt::Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Status")
            .field("label", &self.inner.label)
            .field("outcome", &self.state().outcome)
            .field("children", &self.children().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> StatusCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |tag: &'static str| -> StatusCallback {
                let log = log.clone();
                Box::new(move |_: &Status| log.lock().unwrap().push(tag))
            }
        };
        (log, make)
    }

    #[test]
    fn callbacks_fire_once_in_registration_order() {
        let (log, cb) = recorder();
        let status = Status::new();
        status.add_boxed_callback(cb("first"));
        status.add_boxed_callback(cb("second"));

        status.set_finished().unwrap();
        assert!(status.set_finished().is_err());
        assert!(status.set_exception(TaskError::stop("late")).is_err());

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert!(status.done());
        assert!(status.success());
        assert!(status.exception().is_none());
    }

    #[test]
    fn callback_added_after_completion_runs_immediately() {
        let (log, cb) = recorder();
        let status = Status::new();
        status.set_exception(TaskError::stop("nope")).unwrap();
        status.add_boxed_callback(cb("late"));

        assert_eq!(*log.lock().unwrap(), vec!["late"]);
        assert!(!status.success());
        assert!(matches!(status.exception(), Some(TaskError::Stop(_))));
    }

    #[test]
    fn track_propagates_failure_and_success() {
        let device = Status::new();
        let task = Status::named("task");
        task.track(&device);
        assert!(!task.done());

        device.set_exception(TaskError::fail("motor stuck")).unwrap();
        assert!(matches!(task.exception(), Some(TaskError::Fail(msg)) if msg == "motor stuck"));

        let ok_device = Status::finished();
        let other = Status::new();
        other.track(&ok_device);
        assert!(other.success());
    }

    #[test]
    fn conjunction_waits_for_every_child() {
        let a = Status::new();
        let b = Status::new();
        let c = Status::new();
        let all = Status::all([a.clone(), b.clone(), c.clone()]);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        all.add_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        a.set_finished().unwrap();
        b.set_exception(TaskError::stop("b")).unwrap();
        assert!(!all.done(), "still waiting on c");

        c.set_finished().unwrap();
        assert!(all.done());
        assert!(!all.success());
        assert!(matches!(all.exception(), Some(TaskError::Stop(msg)) if msg == "b"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(all.children().len(), 3);
    }

    #[test]
    fn empty_conjunction_is_finished() {
        assert!(Status::all(Vec::new()).success());
    }

    #[test]
    fn completion_from_another_thread_fires_callbacks() {
        let status = Status::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        status.add_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let remote = status.clone();
        std::thread::spawn(move || remote.set_finished().unwrap())
            .join()
            .unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_resolves_with_outcome() {
        let status = Status::new();
        let remote = status.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            remote.set_exception(TaskError::fail("late failure")).unwrap();
        });

        let result = status.wait().await;
        assert!(matches!(result, Err(TaskError::Fail(_))));
    }
}
