// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Add;

use petgraph::algo::toposort;
use petgraph::graphmap::{DiGraphMap, NodeTrait};

use crate::errors::{Result, TaskgraphError};
use crate::task::{Task, TaskId};

/// Internal node structure: the task handle and its immediate deps.
#[derive(Debug, Clone)]
struct GraphNode {
    task: Task,
    /// Direct dependencies: tasks that must complete before this one runs.
    deps: BTreeSet<TaskId>,
}

/// Something usable as an output binding.
///
/// Plain names bind a result position; `None` skips it.
pub trait OutputName {
    fn into_output_name(self) -> Option<String>;
}

impl OutputName for &str {
    fn into_output_name(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl OutputName for String {
    fn into_output_name(self) -> Option<String> {
        Some(self)
    }
}

impl OutputName for Option<&str> {
    fn into_output_name(self) -> Option<String> {
        self.map(str::to_string)
    }
}

impl OutputName for Option<String> {
    fn into_output_name(self) -> Option<String> {
        self
    }
}

/// Composable DAG of tasks with per-task input/output name bindings.
///
/// Keyed by [`TaskId`], never by name. Every task that appears anywhere in
/// the graph (including as a dependency) has a node, possibly with an empty
/// dependency set.
///
/// Graphs are built small and combined:
///
/// - `a + b` merges two graphs. Dependency sets of a task present in both
///   are unioned; for inputs and outputs the right-hand side wins.
/// - `a.depends_on(b)` makes every task of `a` depend on every task of `b`.
/// - `a.is_depended_on_by(b)` is the mirror image.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskId, GraphNode>,
    inputs: HashMap<TaskId, Vec<String>>,
    outputs: HashMap<TaskId, Vec<Option<String>>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding a single task with no bindings.
    pub fn from_task(task: Task) -> Self {
        let mut graph = Self::new();
        graph.add_task(task, []);
        graph
    }

    /// A graph holding a single task with input and output bindings.
    pub fn node<I, S, O, N>(task: Task, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        O: IntoIterator<Item = N>,
        N: OutputName,
    {
        let mut graph = Self::new();
        graph.set_inputs(&task, inputs);
        graph.set_outputs(&task, outputs);
        graph.add_task(task, []);
        graph
    }

    /// Add `task` with the given direct dependencies.
    ///
    /// If `task` is already present, `deps` are unioned into its set.
    /// Dependencies not yet in the graph get their own (empty) node.
    pub fn add_task<'a>(&mut self, task: Task, deps: impl IntoIterator<Item = &'a Task>) {
        let mut dep_ids = BTreeSet::new();
        for dep in deps {
            dep_ids.insert(dep.id());
            self.ensure_node(dep.clone());
        }

        self.ensure_node(task.clone())
            .deps
            .extend(dep_ids);
    }

    pub fn set_inputs<I, S>(&mut self, task: &Task, inputs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs
            .insert(task.id(), inputs.into_iter().map(Into::into).collect());
    }

    pub fn set_outputs<O, N>(&mut self, task: &Task, outputs: O)
    where
        O: IntoIterator<Item = N>,
        N: OutputName,
    {
        self.outputs.insert(
            task.id(),
            outputs.into_iter().map(OutputName::into_output_name).collect(),
        );
    }

    fn ensure_node(&mut self, task: Task) -> &mut GraphNode {
        self.nodes.entry(task.id()).or_insert_with(|| GraphNode {
            task,
            deps: BTreeSet::new(),
        })
    }

    /// Merge `other` into `self`.
    pub fn merge(mut self, other: TaskGraph) -> Self {
        for (id, node) in other.nodes {
            match self.nodes.get_mut(&id) {
                Some(existing) => existing.deps.extend(node.deps),
                None => {
                    self.nodes.insert(id, node);
                }
            }
        }
        self.inputs.extend(other.inputs);
        self.outputs.extend(other.outputs);
        self
    }

    /// Every task of `self` gains every task of `other` as a dependency;
    /// the result is the merge of both graphs.
    pub fn depends_on(mut self, other: TaskGraph) -> Self {
        let upstream: Vec<TaskId> = other.nodes.keys().copied().collect();
        for node in self.nodes.values_mut() {
            node.deps.extend(upstream.iter().copied());
        }
        self.merge(other)
    }

    /// Every task of `other` gains every task of `self` as a dependency.
    pub fn is_depended_on_by(self, other: TaskGraph) -> Self {
        other.depends_on(self)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, task: &Task) -> bool {
        self.nodes.contains_key(&task.id())
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.nodes.get(&id).map(|n| &n.task)
    }

    /// All tasks, in creation order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.nodes.values().map(|n| &n.task)
    }

    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes.keys().copied()
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.nodes
            .get(&id)
            .into_iter()
            .flat_map(|n| n.deps.iter().copied())
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.deps.contains(&id))
            .map(|(dependent, _)| *dependent)
            .collect()
    }

    pub fn inputs_of(&self, id: TaskId) -> &[String] {
        self.inputs.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn outputs_of(&self, id: TaskId) -> &[Option<String>] {
        self.outputs.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every input name any task requires.
    pub fn required_names(&self) -> BTreeSet<&str> {
        self.nodes
            .keys()
            .flat_map(|id| self.inputs_of(*id))
            .map(String::as_str)
            .collect()
    }

    /// Every output name any task produces.
    pub fn produced_names(&self) -> BTreeSet<&str> {
        self.nodes
            .keys()
            .flat_map(|id| self.outputs_of(*id))
            .filter_map(|name| name.as_deref())
            .collect()
    }

    /// Fail with [`TaskgraphError::DagCycle`] if the dependencies form a cycle.
    pub fn check_acyclic(&self) -> Result<()> {
        let edges = self
            .nodes
            .iter()
            .flat_map(|(id, node)| node.deps.iter().map(move |dep| (*dep, *id)));

        match find_cycle(self.nodes.keys().copied(), edges) {
            None => Ok(()),
            Some(id) => Err(TaskgraphError::DagCycle(format!(
                "cycle detected in task graph involving task '{}' ({id})",
                self.name_of(id)
            ))),
        }
    }

    fn name_of(&self, id: TaskId) -> &str {
        self.task(id).map(Task::name).unwrap_or("<unknown>")
    }
}

/// A node on some cycle of the graph given by `edges` (`dep -> task`), or
/// `None` if it is acyclic.
pub(crate) fn find_cycle<N: NodeTrait>(
    nodes: impl IntoIterator<Item = N>,
    edges: impl IntoIterator<Item = (N, N)>,
) -> Option<N> {
    let mut graph: DiGraphMap<N, ()> = DiGraphMap::new();
    for node in nodes {
        graph.add_node(node);
    }
    for (from, to) in edges {
        graph.add_edge(from, to, ());
    }
    toposort(&graph, None).err().map(|cycle| cycle.node_id())
}

impl Add for TaskGraph {
    type Output = TaskGraph;

    fn add(self, rhs: TaskGraph) -> TaskGraph {
        self.merge(rhs)
    }
}

impl fmt::Display for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, node) in &self.nodes {
            let deps: Vec<&str> = node.deps.iter().map(|d| self.name_of(*d)).collect();
            let outputs: Vec<&str> = self
                .outputs_of(*id)
                .iter()
                .map(|o| o.as_deref().unwrap_or("_"))
                .collect();
            writeln!(
                f,
                "{} {}: after [{}] inputs [{}] outputs [{}]",
                node.task.name(),
                id,
                deps.join(", "),
                self.inputs_of(*id).join(", "),
                outputs.join(", "),
            )?;
        }
        Ok(())
    }
}
