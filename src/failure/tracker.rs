// src/failure/tracker.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::errors::TaskError;
use crate::failure::FailureReporter;

/// Weighted failure accumulator with a suspend signal.
///
/// Each task name carries a weight. A non-fatal failure adds 1, a fatal one
/// adds `1 + suspend_threshold`, so a single fatal failure always trips. A
/// success resets the task's weight to 0.
///
/// The signal is the largest weight across all tasks. The tracker trips when
/// the signal reaches `suspend_threshold` and, once tripped, only clears
/// when the signal drops below `resume_threshold` (which defaults to the
/// suspend threshold).
#[derive(Debug, Clone)]
pub struct FailureTracker {
    suspend_threshold: u32,
    resume_threshold: u32,
    weights: BTreeMap<String, u32>,
    recovered: BTreeSet<String>,
    tripped: bool,
}

impl FailureTracker {
    pub fn new(suspend_threshold: u32) -> Self {
        Self::with_resume_threshold(suspend_threshold, None)
    }

    /// A resume threshold above `suspend_threshold` is clamped down to it.
    pub fn with_resume_threshold(suspend_threshold: u32, resume_threshold: Option<u32>) -> Self {
        Self {
            suspend_threshold,
            resume_threshold: resume_threshold
                .map_or(suspend_threshold, |resume| resume.min(suspend_threshold)),
            weights: BTreeMap::new(),
            recovered: BTreeSet::new(),
            tripped: false,
        }
    }

    pub fn suspend_threshold(&self) -> u32 {
        self.suspend_threshold
    }

    pub fn resume_threshold(&self) -> u32 {
        self.resume_threshold
    }

    /// Record one outcome for `task`. `None` means success.
    pub fn record(&mut self, task: &str, error: Option<&TaskError>) {
        match error {
            None => self.record_success(task),
            Some(err) => self.record_failure(task, err),
        }
        self.update_tripped();
    }

    fn record_success(&mut self, task: &str) {
        if let Some(weight) = self.weights.get_mut(task) {
            if *weight > 0 {
                info!(task = %task, previous_weight = *weight, "task recovered");
                *weight = 0;
                self.recovered.insert(task.to_string());
            }
        }
    }

    fn record_failure(&mut self, task: &str, err: &TaskError) {
        // Unanticipated errors count as fatal.
        let fatal = err.fatality().unwrap_or(true);
        let increment = if fatal {
            self.suspend_threshold.saturating_add(1)
        } else {
            1
        };

        let weight = self.weights.entry(task.to_string()).or_insert(0);
        *weight = weight.saturating_add(increment);
        self.recovered.remove(task);

        warn!(
            task = %task,
            error = %err,
            fatal,
            weight = *weight,
            "task failure recorded"
        );
    }

    fn update_tripped(&mut self) {
        let signal = self.current_signal();
        let was_tripped = self.tripped;

        if !self.tripped && signal >= self.suspend_threshold {
            self.tripped = true;
        } else if self.tripped && signal < self.resume_threshold {
            self.tripped = false;
        }

        match (was_tripped, self.tripped) {
            (false, true) => warn!(
                signal,
                suspend_threshold = self.suspend_threshold,
                "failure breaker tripped; suspending further runs"
            ),
            (true, false) => info!(
                signal,
                resume_threshold = self.resume_threshold,
                "failure breaker cleared"
            ),
            _ => debug!(signal, tripped = self.tripped, "failure signal updated"),
        }
    }

    /// Largest accumulated weight across all tasks (0 if none).
    pub fn current_signal(&self) -> u32 {
        self.weights.values().copied().max().unwrap_or(0)
    }

    pub fn tripped(&self) -> bool {
        self.tripped
    }

    pub fn weight_of(&self, task: &str) -> u32 {
        self.weights.get(task).copied().unwrap_or(0)
    }

    /// Whether `task` has succeeded since its last failure.
    pub fn is_recovered(&self, task: &str) -> bool {
        self.recovered.contains(task)
    }

    /// Clear one task's history, or everything with `None`.
    pub fn reset(&mut self, task: Option<&str>) {
        match task {
            Some(name) => {
                self.weights.remove(name);
                self.recovered.remove(name);
            }
            None => {
                self.weights.clear();
                self.recovered.clear();
            }
        }
        self.update_tripped();
    }
}

impl FailureReporter for FailureTracker {
    fn report(&mut self, task: &str, error: Option<&TaskError>) {
        self.record(task, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fatal_failure_trips() {
        let mut tracker = FailureTracker::new(3);
        tracker.record("move", Some(&TaskError::fail("motor stuck")));
        assert_eq!(tracker.weight_of("move"), 4);
        assert_eq!(tracker.current_signal(), 4);
        assert!(tracker.tripped());
    }

    #[test]
    fn three_non_fatal_failures_trip() {
        let mut tracker = FailureTracker::new(3);
        tracker.record("move", Some(&TaskError::stop("busy")));
        tracker.record("move", Some(&TaskError::stop("busy")));
        assert!(!tracker.tripped());
        tracker.record("move", Some(&TaskError::stop("busy")));
        assert!(tracker.tripped());
    }

    #[test]
    fn success_resets_weight_before_threshold() {
        let mut tracker = FailureTracker::new(3);
        tracker.record("move", Some(&TaskError::stop("busy")));
        tracker.record("move", Some(&TaskError::stop("busy")));
        tracker.record("move", None);
        assert_eq!(tracker.weight_of("move"), 0);
        assert!(tracker.is_recovered("move"));

        tracker.record("move", Some(&TaskError::stop("busy")));
        assert!(!tracker.is_recovered("move"));
        assert!(!tracker.tripped());
    }

    #[test]
    fn unknown_errors_are_fatal() {
        let mut tracker = FailureTracker::new(2);
        tracker.record("read", Some(&TaskError::other(anyhow::anyhow!("???"))));
        assert_eq!(tracker.weight_of("read"), 3);
        assert!(tracker.tripped());
    }

    #[test]
    fn signal_is_the_worst_task() {
        let mut tracker = FailureTracker::new(10);
        tracker.record("a", Some(&TaskError::stop("x")));
        tracker.record("b", Some(&TaskError::stop("x")));
        tracker.record("b", Some(&TaskError::stop("x")));
        assert_eq!(tracker.current_signal(), 2);
        assert_eq!(FailureTracker::new(1).current_signal(), 0);
    }

    #[test]
    fn hysteresis_holds_until_below_resume_threshold() {
        let mut tracker = FailureTracker::with_resume_threshold(3, Some(1));
        for _ in 0..3 {
            tracker.record("a", Some(&TaskError::stop("x")));
        }
        tracker.record("b", Some(&TaskError::stop("x")));
        assert!(tracker.tripped());

        // "a" recovers; "b" still holds the signal at 1.
        tracker.record("a", None);
        assert_eq!(tracker.current_signal(), 1);
        assert!(tracker.tripped());

        tracker.record("b", None);
        assert!(!tracker.tripped());
    }

    #[test]
    fn huge_threshold_saturates_instead_of_overflowing() {
        let mut tracker = FailureTracker::new(u32::MAX);
        tracker.record("move", Some(&TaskError::fail("x")));
        tracker.record("move", Some(&TaskError::fail("x")));
        assert_eq!(tracker.weight_of("move"), u32::MAX);
        assert!(tracker.tripped());

        let mut large = FailureTracker::new(3_000_000_000);
        large.record("move", Some(&TaskError::fail("x")));
        large.record("move", Some(&TaskError::fail("x")));
        assert!(large.tripped());
    }

    #[test]
    fn resume_threshold_above_suspend_is_clamped() {
        let mut tracker = FailureTracker::with_resume_threshold(3, Some(5));
        assert_eq!(tracker.resume_threshold(), 3);

        for _ in 0..4 {
            tracker.record("a", Some(&TaskError::stop("x")));
        }
        assert!(tracker.tripped());
        // Another update at the same signal must not clear the breaker.
        tracker.record("b", None);
        assert_eq!(tracker.current_signal(), 4);
        assert!(tracker.tripped());
    }

    #[test]
    fn reset_clears_one_or_all() {
        let mut tracker = FailureTracker::new(3);
        tracker.record("a", Some(&TaskError::fail("x")));
        tracker.record("b", Some(&TaskError::stop("x")));

        tracker.reset(Some("a"));
        assert_eq!(tracker.weight_of("a"), 0);
        assert_eq!(tracker.current_signal(), 1);
        assert!(!tracker.tripped());

        tracker.reset(None);
        assert_eq!(tracker.current_signal(), 0);
    }
}
