// src/dag/validate.rs

use std::collections::BTreeSet;

use crate::dag::graph::TaskGraph;
use crate::errors::{Result, TaskgraphError};
use crate::variables::VariablePool;

/// Static whole-graph check that every input name has a source.
///
/// A name is known if some task lists it as an output or it is already in
/// `variables`. Ordering is not checked: a name produced only by a task that
/// runs after its consumer passes this check.
pub fn check_variables(graph: &TaskGraph, variables: &VariablePool) -> Result<()> {
    let produced = graph.produced_names();

    let missing: BTreeSet<String> = graph
        .required_names()
        .into_iter()
        .filter(|name| !produced.contains(name) && !variables.contains(name))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TaskgraphError::UnresolvedVariables(missing))
    }
}
