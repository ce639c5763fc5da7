// src/task/args.rs

//! Positional argument access for `organise_inputs` implementations.

use crate::errors::TaskError;
use crate::types::{Args, Value};

/// Read-only view over the ordered arguments a task was dispatched with.
///
/// Positions past the end and `None` slots are treated the same way: the
/// argument was not supplied.
#[derive(Debug, Clone)]
pub struct ArgReader {
    args: Args,
}

impl ArgReader {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn optional(&self, position: usize) -> Option<&Value> {
        self.args.get(position).and_then(Option::as_ref)
    }

    pub fn required(&self, position: usize, name: &'static str) -> Result<&Value, TaskError> {
        self.optional(position)
            .ok_or(TaskError::MissingArgument { position, name })
    }

    /// Cloned value at `position`, or `default` if it was not supplied.
    pub fn or(&self, position: usize, default: impl Into<Value>) -> Value {
        self.optional(position)
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    pub fn required_f64(&self, position: usize, name: &'static str) -> Result<f64, TaskError> {
        let value = self.required(position, name)?;
        value
            .as_f64()
            .ok_or_else(|| invalid(position, name, "a number", value))
    }

    pub fn optional_f64(
        &self,
        position: usize,
        name: &'static str,
    ) -> Result<Option<f64>, TaskError> {
        match self.optional(position) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| invalid(position, name, "a number", value)),
        }
    }

    pub fn required_str(&self, position: usize, name: &'static str) -> Result<String, TaskError> {
        let value = self.required(position, name)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid(position, name, "a string", value))
    }

    pub fn optional_str(
        &self,
        position: usize,
        name: &'static str,
    ) -> Result<Option<String>, TaskError> {
        match self.optional(position) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| invalid(position, name, "a string", value)),
        }
    }

    pub fn into_inner(self) -> Args {
        self.args
    }
}

fn invalid(position: usize, name: &'static str, expected: &'static str, found: &Value) -> TaskError {
    TaskError::InvalidArgument {
        position,
        name,
        expected,
        found: found.kind().to_string(),
    }
}
