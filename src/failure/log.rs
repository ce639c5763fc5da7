// src/failure/log.rs

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::errors::TaskError;
use crate::failure::FailureReporter;

/// Reporter that never suspends anything; it logs consecutive failures
/// per task and the recovery that ends a streak.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    consecutive: BTreeMap<String, u32>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self, task: &str) -> u32 {
        self.consecutive.get(task).copied().unwrap_or(0)
    }

    pub fn reset(&mut self, task: Option<&str>) {
        match task {
            Some(name) => {
                self.consecutive.remove(name);
            }
            None => self.consecutive.clear(),
        }
    }
}

impl FailureReporter for FailureLog {
    fn report(&mut self, task: &str, error: Option<&TaskError>) {
        match error {
            Some(err) => {
                let count = self.consecutive.entry(task.to_string()).or_insert(0);
                *count += 1;
                warn!(
                    task = %task,
                    error = %err,
                    consecutive = *count,
                    "task failed"
                );
            }
            None => {
                if let Some(count) = self.consecutive.get_mut(task) {
                    if *count > 0 {
                        info!(task = %task, previous = *count, "task recovered");
                        *count = 0;
                    }
                }
            }
        }
    }
}
