// src/engine/controller.rs

//! Outer driver producing repeated graph runs.

use tracing::{info, warn};

use crate::dag::TaskGraph;
use crate::errors::Result;
use crate::failure::{FailureLog, FailureTracker};
use crate::types::Value;
use crate::variables::VariablePool;

use super::runtime::run_graph_with;
use super::RunReport;

/// Produces the next graph to run.
///
/// Called once per run with the controller's known values, so the source
/// can decide what to build (e.g. prepend a warm-up graph on the first run).
pub trait GraphSource: Send {
    fn next_graph(&mut self, known_values: &VariablePool) -> Result<TaskGraph>;
}

impl<F> GraphSource for F
where
    F: FnMut(&VariablePool) -> Result<TaskGraph> + Send,
{
    fn next_graph(&mut self, known_values: &VariablePool) -> Result<TaskGraph> {
        self(known_values)
    }
}

/// Summary of [`Controller::run_task_graphs`].
#[derive(Debug, Clone, Default)]
pub struct ControllerReport {
    pub runs: Vec<RunReport>,
    /// The loop stopped because the failure breaker tripped.
    pub suspended: bool,
}

impl ControllerReport {
    pub fn runs_attempted(&self) -> usize {
        self.runs.len()
    }
}

/// Owns the known-values pool and the failure breaker, and keeps running
/// graphs from a [`GraphSource`] while the breaker allows it.
///
/// Every run gets its own copy of the known values; outputs of one run do
/// not leak into the next.
///
/// Without a [`FailureTracker`] failures are only logged and
/// [`run_task_graphs`](Controller::run_task_graphs) performs a single run.
pub struct Controller<S: GraphSource> {
    source: S,
    known_values: VariablePool,
    tracker: Option<FailureTracker>,
    log: FailureLog,
}

impl<S: GraphSource> Controller<S> {
    pub fn new(source: S, known_values: VariablePool) -> Self {
        Self {
            source,
            known_values,
            tracker: None,
            log: FailureLog::new(),
        }
    }

    pub fn with_tracker(mut self, tracker: FailureTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn tracker(&self) -> Option<&FailureTracker> {
        self.tracker.as_ref()
    }

    pub fn tripped(&self) -> bool {
        self.tracker.as_ref().is_some_and(FailureTracker::tripped)
    }

    /// Clear the breaker so runs can continue.
    pub fn resume(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            info!(signal = tracker.current_signal(), "resuming; clearing failure history");
            tracker.reset(None);
        }
        self.log.reset(None);
    }

    pub fn known_values(&self) -> &VariablePool {
        &self.known_values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.known_values.get(name)
    }

    pub fn add_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.known_values.insert(name, value);
    }

    pub fn add_values<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.known_values.extend(values);
    }

    /// Remove every entry holding `target`; if no entry holds it and it is a
    /// string, remove the entry with that name instead.
    pub fn remove_value(&mut self, target: impl Into<Value>) {
        let target = target.into();
        let removed = self.known_values.remove_value(&target);
        if removed.is_empty() {
            if let Value::Str(name) = &target {
                self.known_values.remove(name);
            }
        }
    }

    /// Build and run one graph.
    pub async fn run_once(&mut self) -> Result<RunReport> {
        let graph = self.source.next_graph(&self.known_values)?;
        let variables = self.known_values.clone();
        match self.tracker.as_mut() {
            Some(tracker) => run_graph_with(graph, variables, tracker).await,
            None => run_graph_with(graph, variables, &mut self.log).await,
        }
    }

    /// Run graphs until the breaker trips or `max_runs` is reached.
    ///
    /// With no tracker configured this performs exactly one run.
    pub async fn run_task_graphs(&mut self, max_runs: Option<usize>) -> Result<ControllerReport> {
        let mut report = ControllerReport::default();
        let limit = if self.tracker.is_some() { max_runs } else { Some(1) };

        loop {
            if self.tripped() {
                warn!(runs = report.runs.len(), "failure breaker tripped; not starting another run");
                report.suspended = true;
                break;
            }
            if limit.is_some_and(|max| report.runs.len() >= max) {
                break;
            }

            let run = report.runs.len() + 1;
            info!(run, "starting graph run");
            let outcome = self.run_once().await?;
            info!(run, summary = %outcome, "graph run done");
            report.runs.push(outcome);
        }

        Ok(report)
    }
}
