// src/dag/scheduler.rs

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task_info::{RunState, ScheduledTask, TaskRunState};
use crate::dag::validate::check_variables;
use crate::errors::{Result, TaskError};
use crate::failure::FailureReporter;
use crate::status::Outcome;
use crate::task::TaskId;
use crate::variables::VariablePool;

/// Pure scheduling core for one graph run.
///
/// The engine holds the graph, the run's private copy of the variable pool
/// and per-task run state. It is responsible for:
/// - deciding which tasks are ready (all deps completed successfully)
/// - building their argument lists from the pool
/// - merging outputs of successful tasks back into the pool
/// - reporting every outcome to the failure reporter
/// - deciding when the run is complete
///
/// It performs no IO and never touches tokio; the async shell in
/// [`crate::engine::runtime`] feeds it completion events.
pub struct DecisionEngine<'r> {
    graph: TaskGraph,
    variables: VariablePool,
    states: HashMap<TaskId, RunState>,
    /// Successful tasks in completion order.
    completed: Vec<TaskId>,
    /// Failed tasks in completion order.
    failed: Vec<(TaskId, TaskError)>,
    reporter: Option<&'r mut dyn FailureReporter>,
}

impl fmt::Debug for DecisionEngine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("tasks", &self.graph.len())
            .field("completed", &self.completed.len())
            .field("failed", &self.failed.len())
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

impl<'r> DecisionEngine<'r> {
    /// Build an engine, failing with
    /// [`UnresolvedVariables`](crate::errors::TaskgraphError::UnresolvedVariables)
    /// if some input name is neither produced by a task nor in `variables`.
    pub fn new(graph: TaskGraph, variables: VariablePool) -> Result<Self> {
        check_variables(&graph, &variables)?;

        let states = graph
            .task_ids()
            .map(|id| (id, RunState::Pending))
            .collect();

        debug!(tasks = graph.len(), variables = %variables, "decision engine created");

        Ok(Self {
            graph,
            variables,
            states,
            completed: Vec::new(),
            failed: Vec::new(),
            reporter: None,
        })
    }

    /// Report every task outcome to `reporter`.
    pub fn with_reporter(mut self, reporter: &'r mut dyn FailureReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn variables(&self) -> &VariablePool {
        &self.variables
    }

    pub fn run_state_of(&self, id: TaskId) -> TaskRunState {
        self.states.get(&id).copied().into()
    }

    /// Collect every pending task whose dependencies all completed
    /// successfully, mark it dispatched and resolve its arguments.
    ///
    /// Returns nothing once any task has failed.
    pub fn take_ready(&mut self) -> Vec<ScheduledTask> {
        if !self.failed.is_empty() {
            return Vec::new();
        }

        // Decide first, then mutate.
        let candidates: Vec<TaskId> = self
            .graph
            .task_ids()
            .filter(|id| self.states.get(id) == Some(&RunState::Pending))
            .filter(|id| self.deps_satisfied(*id))
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for id in candidates {
            let Some(task) = self.graph.task(id) else {
                continue;
            };
            let args = self.variables.args_for(self.graph.inputs_of(id));
            let scheduled = ScheduledTask {
                task: task.clone(),
                args,
            };
            info!(task = %scheduled.name(), id = %id, "dependencies satisfied; dispatching task");
            self.states.insert(id, RunState::Running);
            ready.push(scheduled);
        }

        ready
    }

    fn deps_satisfied(&self, id: TaskId) -> bool {
        self.graph
            .dependencies_of(id)
            .all(|dep| self.states.get(&dep) == Some(&RunState::DoneSuccess))
    }

    /// Handle the terminal outcome of a dispatched task.
    ///
    /// Pool update, state change and outcome report happen together. Events
    /// for tasks that are unknown, not dispatched or already terminal are
    /// ignored.
    pub fn handle_completion(&mut self, id: TaskId, outcome: Outcome) -> SchedulerStep {
        let Some(task) = self.graph.task(id).cloned() else {
            warn!(id = %id, "completion for task not in graph; ignoring");
            return SchedulerStep::default();
        };

        match self.states.get(&id) {
            Some(RunState::Running) => {}
            state => {
                warn!(task = %task.name(), ?state, "completion for task that is not running; ignoring");
                return SchedulerStep::default();
            }
        }

        let mut newly_failed = Vec::new();

        match outcome {
            Outcome::Finished => {
                let results = task.get_results(self.graph.outputs_of(id));
                debug!(task = %task.name(), outputs = results.len(), "task completed successfully");
                self.variables.extend(results);
                self.states.insert(id, RunState::DoneSuccess);
                self.completed.push(id);
                self.report(task.name(), None);
            }
            Outcome::Failed(err) => {
                warn!(task = %task.name(), error = %err, "task failed; no further tasks will be dispatched");
                self.states.insert(id, RunState::DoneFailed);
                self.report(task.name(), Some(&err));
                self.failed.push((id, err));
                newly_failed.push(task.name().to_string());
            }
        }

        let newly_scheduled = self.take_ready();
        let run_just_finished = self.is_complete();
        if run_just_finished {
            info!(
                completed = self.completed.len(),
                failed = self.failed.len(),
                "graph run complete"
            );
        }

        SchedulerStep {
            newly_scheduled,
            newly_failed,
            run_just_finished,
        }
    }

    fn report(&mut self, task: &str, error: Option<&TaskError>) {
        if let Some(reporter) = self.reporter.as_deref_mut() {
            reporter.report(task, error);
        }
    }

    /// Complete once any task failed, or once every task is done.
    pub fn is_complete(&self) -> bool {
        !self.failed.is_empty() || self.states.values().all(|s| s.is_terminal())
    }

    /// Dispatched tasks whose completion has not been observed yet.
    pub fn in_flight(&self) -> usize {
        self.states
            .values()
            .filter(|s| **s == RunState::Running)
            .count()
    }

    /// Names of tasks that are not done, sorted.
    pub fn unfinished(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .graph
            .tasks()
            .filter(|t| !self.states.get(&t.id()).is_some_and(|s| s.is_terminal()))
            .map(|t| t.name().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn completed(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.completed.iter().copied()
    }

    pub fn failed(&self) -> &[(TaskId, TaskError)] {
        &self.failed
    }

    /// Consume the engine, returning the final pool and outcome lists.
    pub(crate) fn into_parts(self) -> (TaskGraph, VariablePool, Vec<TaskId>, Vec<(TaskId, TaskError)>) {
        (self.graph, self.variables, self.completed, self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;
    use crate::tasks::TransparentTask;
    use crate::types::Value;

    fn task(name: &str) -> Task {
        Task::new(name, TransparentTask)
    }

    #[test]
    fn dispatches_in_dependency_order() {
        let (a, b, c) = (task("a"), task("b"), task("c"));
        let graph = TaskGraph::from_task(c.clone())
            .depends_on(TaskGraph::from_task(b.clone()).depends_on(TaskGraph::from_task(a.clone())));
        let mut engine = DecisionEngine::new(graph, VariablePool::new()).unwrap();

        let first: Vec<TaskId> = engine.take_ready().iter().map(ScheduledTask::id).collect();
        assert_eq!(first, vec![a.id()]);
        assert!(engine.take_ready().is_empty(), "a is already dispatched");
        assert_eq!(engine.run_state_of(a.id()), TaskRunState::Running);

        let step = engine.handle_completion(a.id(), Outcome::Finished);
        let next: Vec<TaskId> = step.newly_scheduled.iter().map(ScheduledTask::id).collect();
        assert_eq!(next, vec![b.id()]);
        assert!(!step.run_just_finished);

        let step = engine.handle_completion(b.id(), Outcome::Finished);
        assert_eq!(step.newly_scheduled.len(), 1);
        let step = engine.handle_completion(c.id(), Outcome::Finished);
        assert!(step.run_just_finished);
        assert_eq!(engine.completed().collect::<Vec<_>>(), vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn absent_inputs_resolve_to_none() {
        let consumer = task("consumer");
        let graph = TaskGraph::node(consumer.clone(), ["value", "later"], Vec::<String>::new())
            + TaskGraph::node(task("producer"), Vec::<String>::new(), ["later"]);
        let pool: VariablePool = [("value", 7)].into_iter().collect();
        let mut engine = DecisionEngine::new(graph, pool).unwrap();

        let ready = engine.take_ready();
        let scheduled = ready.iter().find(|s| s.id() == consumer.id()).unwrap();
        assert_eq!(scheduled.args, vec![Some(Value::Int(7)), None]);
    }

    #[test]
    fn failure_halts_dispatch_and_reports() {
        let (a, b, c) = (task("a"), task("b"), task("c"));
        let graph = TaskGraph::from_task(c.clone()).depends_on(TaskGraph::from_task(a.clone()))
            + TaskGraph::from_task(b.clone());

        let mut reports: Vec<(String, bool)> = Vec::new();
        let mut reporter = |name: &str, err: Option<&TaskError>| {
            reports.push((name.to_string(), err.is_some()));
        };

        {
            let mut engine = DecisionEngine::new(graph, VariablePool::new())
                .unwrap()
                .with_reporter(&mut reporter);
            assert_eq!(engine.take_ready().len(), 2);

            let step = engine.handle_completion(b.id(), Outcome::Failed(TaskError::stop("no sample")));
            assert_eq!(step.newly_failed, vec!["b".to_string()]);
            assert!(step.run_just_finished);

            // a was already in flight; it may still finish, but c never starts.
            let step = engine.handle_completion(a.id(), Outcome::Finished);
            assert!(step.newly_scheduled.is_empty());
            assert_eq!(engine.run_state_of(c.id()), TaskRunState::Pending);
            assert_eq!(engine.unfinished(), vec!["c".to_string()]);
        }

        assert_eq!(reports, vec![("b".to_string(), true), ("a".to_string(), false)]);
    }

    #[test]
    fn duplicate_and_unknown_completions_are_ignored() {
        let a = task("a");
        let mut engine = DecisionEngine::new(TaskGraph::from_task(a.clone()), VariablePool::new()).unwrap();

        let step = engine.handle_completion(a.id(), Outcome::Finished);
        assert!(!step.run_just_finished, "a was never dispatched");

        engine.take_ready();
        assert!(engine.handle_completion(a.id(), Outcome::Finished).run_just_finished);
        let again = engine.handle_completion(a.id(), Outcome::Failed(TaskError::fail("late")));
        assert!(again.newly_failed.is_empty());
        assert!(engine.failed().is_empty());

        let stranger = task("stranger");
        assert!(engine.handle_completion(stranger.id(), Outcome::Finished).newly_scheduled.is_empty());
    }

    #[test]
    fn unresolved_variables_fail_construction() {
        let graph = TaskGraph::node(task("t"), ["y"], Vec::<String>::new());
        assert!(DecisionEngine::new(graph, VariablePool::new()).is_err());
    }
}
