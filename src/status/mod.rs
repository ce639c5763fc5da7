// src/status/mod.rs

//! Completion cells for asynchronous operations.
//!
//! - [`cell`] holds [`Status`], its terminal [`Outcome`] and the conjunctive
//!   variant built by [`Status::all`].
//! - [`group`] keeps statuses under a group tag so a task can present a set
//!   of concurrent sub-operations as one status.

pub mod cell;
pub mod group;

pub use cell::{Outcome, Status, StatusCallback};
pub use group::StatusGroups;
