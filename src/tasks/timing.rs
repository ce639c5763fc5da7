// src/tasks/timing.rs

//! Pauses and waits on groups of concurrent operations.

use std::time::Duration;

use tracing::debug;

use crate::errors::TaskError;
use crate::status::{Status, StatusGroups};
use crate::task::{ArgReader, BoxFuture, Completion, TaskBody, TaskContext};
use crate::types::Args;

const DEFAULT_SLEEP: Duration = Duration::from_secs(1);

fn seconds_or(reader: &ArgReader, position: usize, default: Duration) -> Result<Duration, TaskError> {
    Ok(reader
        .optional_f64(position, "seconds")?
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default))
}

/// Sleeps, then finishes.
///
/// An optional positive seconds argument overrides the constructor value,
/// which itself defaults to one second.
#[derive(Debug, Clone)]
pub struct SleepTask {
    default: Duration,
}

impl SleepTask {
    pub fn new(default: Option<Duration>) -> Self {
        Self {
            default: default.filter(|d| !d.is_zero()).unwrap_or(DEFAULT_SLEEP),
        }
    }

    pub fn seconds(secs: f64) -> Self {
        Self::new(Duration::try_from_secs_f64(secs).ok())
    }
}

impl Default for SleepTask {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TaskBody for SleepTask {
    type Input = Duration;

    fn organise_inputs(&self, args: Args) -> Result<Duration, TaskError> {
        seconds_or(&ArgReader::new(args), 0, self.default)
    }

    fn run<'a>(&'a self, duration: Duration, ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            debug!(task = %ctx.name(), ?duration, "sleeping");
            tokio::time::sleep(duration).await;
            Ok(Completion::Finished)
        })
    }
}

/// Starts `count` concurrent timers registered under one group and
/// completes when the whole group has.
///
/// An optional seconds argument overrides the per-timer duration.
#[derive(Debug, Clone)]
pub struct GroupedSleepTask {
    groups: StatusGroups,
    group: String,
    count: usize,
    default: Duration,
}

impl GroupedSleepTask {
    pub fn new(groups: StatusGroups, group: impl Into<String>, count: usize, default: Duration) -> Self {
        Self {
            groups,
            group: group.into(),
            count,
            default,
        }
    }
}

impl TaskBody for GroupedSleepTask {
    type Input = Duration;

    fn organise_inputs(&self, args: Args) -> Result<Duration, TaskError> {
        seconds_or(&ArgReader::new(args), 0, self.default)
    }

    fn run<'a>(&'a self, duration: Duration, _ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            for i in 0..self.count {
                let timer = Status::named(format!("{}[{i}]", self.group));
                self.groups.add(&self.group, timer.clone());
                // Stagger so members finish in a different order than they start.
                let delay = duration.mul_f64(1.0 + (self.count - i) as f64 / self.count as f64 / 2.0);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    timer.set_finished().ok();
                });
            }

            match self.groups.combined(&self.group) {
                Some(all) => Ok(Completion::Track(all)),
                None => Ok(Completion::Finished),
            }
        })
    }
}

/// Completes when every status registered under a group has.
///
/// The group name comes from the first argument, falling back to the
/// constructor value. With no group, or an empty one, it finishes at once.
#[derive(Debug, Clone)]
pub struct WaitGroupTask {
    groups: StatusGroups,
    group: Option<String>,
}

impl WaitGroupTask {
    pub fn new(groups: StatusGroups, group: Option<String>) -> Self {
        Self { groups, group }
    }
}

impl TaskBody for WaitGroupTask {
    type Input = Option<String>;

    fn organise_inputs(&self, args: Args) -> Result<Option<String>, TaskError> {
        let group = ArgReader::new(args).optional_str(0, "group")?;
        Ok(group.or_else(|| self.group.clone()))
    }

    fn run<'a>(&'a self, group: Option<String>, _ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            let combined = group.as_deref().and_then(|g| self.groups.combined(g));
            Ok(match combined {
                Some(all) => Completion::Track(all),
                None => Completion::Finished,
            })
        })
    }
}
