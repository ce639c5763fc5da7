// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{DecisionEngine, ScheduledTask, TaskGraph};
use crate::errors::{Result, TaskError, TaskgraphError};
use crate::failure::FailureReporter;
use crate::status::Outcome;
use crate::task::TaskId;
use crate::variables::VariablePool;

use super::{CompletionEvent, RunReport};

/// Drives a [`DecisionEngine`] to completion.
///
/// This is the IO shell around the engine: it starts the tasks the engine
/// hands out and feeds their completion events back, one at a time, so
/// every pool update is applied as a single step.
///
/// Task statuses report through an unbounded channel. Once the runtime
/// returns, the receiver is gone and late completions from tasks still in
/// flight are dropped.
pub struct GraphRuntime<'r> {
    engine: DecisionEngine<'r>,
    event_tx: mpsc::UnboundedSender<CompletionEvent>,
    event_rx: mpsc::UnboundedReceiver<CompletionEvent>,
}

impl fmt::Debug for GraphRuntime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRuntime")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<'r> GraphRuntime<'r> {
    pub fn new(engine: DecisionEngine<'r>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            event_tx,
            event_rx,
        }
    }

    /// Main loop.
    ///
    /// - Dispatch every ready task.
    /// - Stop if the engine says the run is complete.
    /// - Otherwise wait for the next completion and feed it to the engine.
    ///
    /// Returns [`TaskgraphError::Stalled`] if nothing is in flight, nothing
    /// is ready and the run is not complete.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(tasks = self.engine.graph().len(), "graph run started");

        let mut ready = self.engine.take_ready();

        loop {
            self.dispatch(ready);

            if self.engine.is_complete() {
                break;
            }

            if self.engine.in_flight() == 0 {
                let stuck = self.engine.unfinished();
                warn!(?stuck, "graph run stalled");
                return Err(TaskgraphError::Stalled(stuck));
            }

            let Some(event) = self.event_rx.recv().await else {
                // The runtime holds a sender, so the channel stays open.
                return Err(TaskgraphError::Stalled(self.engine.unfinished()));
            };

            debug!(task = %event.task, success = event.outcome.is_success(), "runtime received completion");

            let step = self.engine.handle_completion(event.task, event.outcome);
            ready = step.newly_scheduled;
        }

        Ok(self.into_report())
    }

    fn dispatch(&mut self, tasks: Vec<ScheduledTask>) {
        if tasks.is_empty() {
            return;
        }

        let names: Vec<_> = tasks.iter().map(ScheduledTask::describe).collect();
        debug!(?names, "starting ready tasks");

        for scheduled in tasks {
            let id = scheduled.id();

            if scheduled.task.is_started() {
                warn!(task = %scheduled.name(), "task was already started outside this run");
                let err = TaskgraphError::TaskAlreadyStarted(scheduled.name().to_string());
                self.send_failure(id, TaskError::other(err));
                continue;
            }

            let tx = self.event_tx.clone();
            scheduled.task.add_complete_callback(move |status| {
                let outcome = status
                    .outcome()
                    .unwrap_or_else(|| Outcome::Failed(TaskError::fail("status fired without outcome")));
                // The receiver is gone once the run has terminated.
                let _ = tx.send(CompletionEvent { task: id, outcome });
            });

            if let Err(err) = scheduled.task.execute(scheduled.args) {
                self.send_failure(id, TaskError::other(err));
            }
        }
    }

    fn send_failure(&self, id: TaskId, err: TaskError) {
        let _ = self.event_tx.send(CompletionEvent {
            task: id,
            outcome: Outcome::Failed(err),
        });
    }

    fn into_report(self) -> RunReport {
        let (graph, variables, completed, failed) = self.engine.into_parts();
        let name_of = |id| {
            graph
                .task(id)
                .map(|t| t.name().to_string())
                .unwrap_or_else(|| id.to_string())
        };

        let report = RunReport {
            variables,
            completed: completed.into_iter().map(name_of).collect(),
            failed: failed
                .into_iter()
                .map(|(id, err)| (name_of(id), err))
                .collect(),
        };
        info!(summary = %report, "graph run finished");
        report
    }
}

/// Run `graph` against a copy of `variables`.
pub async fn run_graph(graph: TaskGraph, variables: VariablePool) -> Result<RunReport> {
    let engine = DecisionEngine::new(graph, variables)?;
    GraphRuntime::new(engine).run().await
}

/// Like [`run_graph`], reporting every task outcome to `reporter`.
pub async fn run_graph_with(
    graph: TaskGraph,
    variables: VariablePool,
    reporter: &mut dyn FailureReporter,
) -> Result<RunReport> {
    let engine = DecisionEngine::new(graph, variables)?.with_reporter(reporter);
    GraphRuntime::new(engine).run().await
}
