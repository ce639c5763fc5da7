#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskgraph::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use taskgraph::task::{BoxFuture, Completion, Task, TaskBody, TaskContext};
use taskgraph::types::{Args, Value};
use taskgraph::TaskError;

/// Shared record of which recording tasks ran, in start order, and with
/// which arguments.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<(String, Args)>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, name: &str, args: Args) {
        self.entries.lock().unwrap().push((name.to_string(), args));
    }

    /// Task names in the order their bodies started.
    pub fn order(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Arguments the named task was started with.
    pub fn args_of(&self, name: &str) -> Option<Args> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, args)| args.clone())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order().iter().position(|n| n == name)
    }
}

/// Builder for a task body that logs its start, optionally waits, then
/// either finishes with fixed results or fails.
pub struct RecordingTask {
    log: ExecutionLog,
    results: Vec<Value>,
    delay: Option<Duration>,
    error: Option<TaskError>,
}

impl RecordingTask {
    pub fn new(log: &ExecutionLog) -> Self {
        Self {
            log: log.clone(),
            results: Vec::new(),
            delay: None,
            error: None,
        }
    }

    pub fn results(mut self, results: Vec<Value>) -> Self {
        self.results = results;
        self
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    pub fn fails_with(mut self, error: TaskError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn build(self, name: &str) -> Task {
        Task::new(name, self)
    }
}

impl TaskBody for RecordingTask {
    type Input = Args;

    fn organise_inputs(&self, args: Args) -> Result<Args, TaskError> {
        Ok(args)
    }

    fn run<'a>(&'a self, input: Args, ctx: TaskContext) -> BoxFuture<'a, Result<Completion, TaskError>> {
        Box::pin(async move {
            self.log.push(ctx.name(), input);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = &self.error {
                return Err(err.clone());
            }
            ctx.overwrite_results(self.results.clone());
            Ok(Completion::Finished)
        })
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                variables: BTreeMap::new(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_variable(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.config.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn suspend_threshold(mut self, threshold: u32) -> Self {
        self.config.config.suspend_threshold = threshold;
        self
    }

    pub fn runs(mut self, runs: usize) -> Self {
        self.config.config.runs = runs;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: &str) -> Self {
        Self {
            task: TaskConfig {
                kind: kind.to_string(),
                after: vec![],
                inputs: vec![],
                outputs: vec![],
                seconds: None,
                reason: None,
                count: None,
                group: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, name: &str) -> Self {
        self.task.inputs.push(name.to_string());
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.task.outputs.push(name.to_string());
        self
    }

    pub fn seconds(mut self, seconds: f64) -> Self {
        self.task.seconds = Some(seconds);
        self
    }

    pub fn reason(mut self, reason: &str) -> Self {
        self.task.reason = Some(reason.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
