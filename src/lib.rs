// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod failure;
pub mod logging;
pub mod status;
pub mod task;
pub mod tasks;
pub mod types;
pub mod variables;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::{build_graph, failure_tracker, initial_variables};
use crate::engine::Controller;

pub use crate::dag::{DecisionEngine, TaskGraph};
pub use crate::engine::{run_graph, run_graph_with, RunReport};
pub use crate::errors::{TaskError, TaskgraphError};
pub use crate::failure::{FailureLog, FailureReporter, FailureTracker};
pub use crate::status::Status;
pub use crate::task::{Task, TaskBody, TaskContext};
pub use crate::types::Value;
pub use crate::variables::VariablePool;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - run file loading and validation
/// - a controller whose graph source rebuilds the graph for every run
/// - the failure breaker from `[config]`
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let runs = args.runs.unwrap_or(cfg.config.runs);
    info!(config = %config_path.display(), runs, "starting controller");

    let source_cfg = cfg.clone();
    let mut controller = Controller::new(
        move |_known: &VariablePool| build_graph(&source_cfg),
        initial_variables(&cfg),
    )
    .with_tracker(failure_tracker(&cfg));

    let report = controller.run_task_graphs(Some(runs)).await?;

    for (i, run) in report.runs.iter().enumerate() {
        println!("run {}: {}", i + 1, run);
    }
    if report.suspended {
        println!(
            "suspended after {} run(s): failure signal {} reached threshold {}",
            report.runs_attempted(),
            controller.tracker().map(FailureTracker::current_signal).unwrap_or(0),
            cfg.config.suspend_threshold
        );
    }

    Ok(())
}

/// Simple dry-run output: print settings, variables and the graph.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let graph = build_graph(cfg)?;

    println!("taskgraph dry-run");
    println!("  config.suspend_threshold = {}", cfg.config.suspend_threshold);
    if let Some(resume) = cfg.config.resume_threshold {
        println!("  config.resume_threshold = {resume}");
    }
    println!("  config.runs = {}", cfg.config.runs);
    println!("  variables = {}", initial_variables(cfg));
    println!();

    println!("tasks ({}):", graph.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name} [{}]", task.kind);
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if !task.inputs.is_empty() {
            println!("      inputs: {:?}", task.inputs);
        }
        if !task.outputs.is_empty() {
            println!("      outputs: {:?}", task.outputs);
        }
    }

    debug!(graph = %graph, "dry-run complete (no execution)");
    Ok(())
}
