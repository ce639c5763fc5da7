// src/failure/mod.rs

//! Failure reporting.
//!
//! The decision engine reports every task outcome (`None` for success) to a
//! [`FailureReporter`]. Two reporters ship with the crate:
//!
//! - [`FailureTracker`]: weighted circuit breaker that trips once failures
//!   accumulate, telling the outer driver to stop producing graph runs.
//! - [`FailureLog`]: only logs consecutive failures and recoveries.
//!
//! Any `FnMut(&str, Option<&TaskError>)` closure is a reporter too.

use crate::errors::TaskError;

pub mod log;
pub mod tracker;

pub use log::FailureLog;
pub use tracker::FailureTracker;

/// Receives the outcome of every task the engine sees complete.
pub trait FailureReporter: Send {
    fn report(&mut self, task: &str, error: Option<&TaskError>);
}

impl<F> FailureReporter for F
where
    F: FnMut(&str, Option<&TaskError>) + Send,
{
    fn report(&mut self, task: &str, error: Option<&TaskError>) {
        self(task, error)
    }
}
