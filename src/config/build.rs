// src/config/build.rs

//! Turn a validated [`ConfigFile`] into a runnable [`TaskGraph`].

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::config::model::{ConfigFile, TaskConfig, TaskKind};
use crate::dag::TaskGraph;
use crate::errors::{Result, TaskgraphError};
use crate::failure::FailureTracker;
use crate::status::StatusGroups;
use crate::task::Task;
use crate::tasks::{
    CloseRunTask, FailTask, GroupedSleepTask, OpenRunTask, SleepTask, StopTask, TransparentTask,
    WaitGroupTask,
};
use crate::variables::VariablePool;

/// Instantiate fresh tasks for every `[task.<name>]` and wire them up.
///
/// Tasks are single-shot, so call this once per run.
pub fn build_graph(cfg: &ConfigFile) -> Result<TaskGraph> {
    let groups = StatusGroups::new();

    let mut tasks: BTreeMap<&str, Task> = BTreeMap::new();
    for (name, tc) in cfg.task.iter() {
        tasks.insert(name.as_str(), instantiate(name, tc, &groups)?);
    }

    let mut graph = TaskGraph::new();
    for (name, tc) in cfg.task.iter() {
        let Some(task) = tasks.get(name.as_str()) else {
            continue;
        };
        let deps = tc.after.iter().filter_map(|dep| tasks.get(dep.as_str()));
        graph.add_task(task.clone(), deps);
        graph.set_inputs(task, tc.inputs.iter().cloned());
        graph.set_outputs(task, tc.output_names());
    }

    debug!(tasks = graph.len(), "task graph built from config");
    Ok(graph)
}

fn instantiate(name: &str, tc: &TaskConfig, groups: &StatusGroups) -> Result<Task> {
    let kind = TaskKind::parse(&tc.kind).ok_or_else(|| TaskgraphError::UnknownTaskKind {
        task: name.to_string(),
        kind: tc.kind.clone(),
    })?;

    let seconds = tc.seconds.and_then(|s| Duration::try_from_secs_f64(s).ok());
    let group = tc.group.clone().unwrap_or_else(|| name.to_string());
    let reason = |verb: &str| tc.reason.clone().unwrap_or_else(|| format!("{name} {verb}"));

    let task = match kind {
        TaskKind::Noop | TaskKind::Transparent => Task::new(name, TransparentTask),
        TaskKind::Sleep => Task::new(name, SleepTask::new(seconds)),
        TaskKind::OpenRun => Task::new(name, OpenRunTask::new()),
        TaskKind::CloseRun => Task::new(name, CloseRunTask::new()),
        TaskKind::Stop => Task::new(name, StopTask::new(reason("stopped"))),
        TaskKind::Fail => Task::new(name, FailTask::new(reason("failed"))),
        TaskKind::GroupedSleep => Task::new(
            name,
            GroupedSleepTask::new(
                groups.clone(),
                group,
                tc.count.unwrap_or(1),
                seconds.unwrap_or(Duration::from_secs(1)),
            ),
        ),
        TaskKind::WaitGroup => Task::new(name, WaitGroupTask::new(groups.clone(), Some(group))),
    };

    Ok(task)
}

/// Initial variable pool from `[variables]`.
pub fn initial_variables(cfg: &ConfigFile) -> VariablePool {
    VariablePool::from(cfg.variables.clone())
}

/// Breaker configured from `[config]`.
pub fn failure_tracker(cfg: &ConfigFile) -> FailureTracker {
    FailureTracker::with_resume_threshold(cfg.config.suspend_threshold, cfg.config.resume_threshold)
}
