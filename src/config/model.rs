// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::Value;

/// Top-level run file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// suspend_threshold = 3
///
/// [variables]
/// value = 7
///
/// [task.open]
/// kind = "open_run"
/// outputs = ["run_id"]
///
/// [task.move]
/// kind = "transparent"
/// inputs = ["run_id", "value"]
/// after = ["open"]
/// ```
///
/// All sections are optional at this stage; validation requires at least
/// one task.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Initial variable pool.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A validated run file. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub variables: BTreeMap<String, Value>,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        variables: BTreeMap<String, Value>,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            config,
            variables,
            task,
        }
    }
}

/// `[config]` section: breaker thresholds and run count.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Failure weight at which the breaker trips.
    #[serde(default = "default_suspend_threshold")]
    pub suspend_threshold: u32,

    /// Weight below which a tripped breaker clears. Defaults to
    /// `suspend_threshold`.
    #[serde(default)]
    pub resume_threshold: Option<u32>,

    /// Number of graph runs the controller attempts.
    #[serde(default = "default_runs")]
    pub runs: usize,
}

fn default_suspend_threshold() -> u32 {
    3
}

fn default_runs() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            suspend_threshold: default_suspend_threshold(),
            resume_threshold: None,
            runs: default_runs(),
        }
    }
}

/// Built-in task bodies a run file can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Noop,
    Sleep,
    OpenRun,
    CloseRun,
    Transparent,
    Stop,
    Fail,
    GroupedSleep,
    WaitGroup,
}

impl TaskKind {
    pub fn parse(kind: &str) -> Option<Self> {
        let kind = match kind.trim().to_lowercase().replace('-', "_").as_str() {
            "noop" => TaskKind::Noop,
            "sleep" => TaskKind::Sleep,
            "open_run" => TaskKind::OpenRun,
            "close_run" => TaskKind::CloseRun,
            "transparent" => TaskKind::Transparent,
            "stop" => TaskKind::Stop,
            "fail" => TaskKind::Fail,
            "grouped_sleep" => TaskKind::GroupedSleep,
            "wait_group" => TaskKind::WaitGroup,
            _ => return None,
        };
        Some(kind)
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Which built-in body to run (`sleep`, `open_run`, ...).
    pub kind: String,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Variable names read as ordered arguments.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Variable names for the ordered results. An empty string skips
    /// that position.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Default duration for `sleep` and `grouped_sleep`.
    #[serde(default)]
    pub seconds: Option<f64>,

    /// Failure reason for `stop` and `fail`.
    #[serde(default)]
    pub reason: Option<String>,

    /// Timer count for `grouped_sleep`.
    #[serde(default)]
    pub count: Option<usize>,

    /// Group tag for `grouped_sleep` and `wait_group`. Defaults to the task
    /// name.
    #[serde(default)]
    pub group: Option<String>,
}

impl TaskConfig {
    /// Output bindings with empty names mapped to `None`.
    pub fn output_names(&self) -> Vec<Option<String>> {
        self.outputs
            .iter()
            .map(|name| (!name.is_empty()).then(|| name.clone()))
            .collect()
    }
}
