// src/config/mod.rs

//! Run file loading, validation and graph building.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a run file from disk (`loader.rs`).
//! - Validate invariants like DAG correctness (`validate.rs`).
//! - Build task graphs, the initial pool and the breaker (`build.rs`).

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::{build_graph, failure_tracker, initial_variables};
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig, TaskKind};
