// src/dag/graph.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::TaskSet;
use crate::engine::TaskName;
use crate::errors::{BistroError, Result};

/// Internal node structure: stores immediate neighbours in both directions.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Tasks that must run before this one (they list this task in `run`).
    deps: Vec<TaskName>,
    /// Tasks that run after this one (this task's own `run` list).
    dependents: Vec<TaskName>,
}

/// Dependency graph over task names.
///
/// For
///
/// ```toml
/// [task.A]
/// run = ["B"]
/// ```
///
/// we add the edge `A -> B`: `A` runs first, `B` depends on it.
///
/// Nodes keep their insertion order so that every ordering query is
/// deterministic for a given task set.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, DagNode>,
}

impl DependencyGraph {
    /// Build the graph for a task set.
    pub fn build(tasks: &TaskSet) -> Result<Self> {
        Self::from_run_lists(tasks.iter().map(|(name, cfg)| (name, cfg.run.as_slice())))
    }

    /// Build the graph from `(task, run list)` pairs, in insertion order.
    ///
    /// Fails with [`BistroError::ConfigError`] when a `run` list names an
    /// unknown task and with [`BistroError::DagCycle`] when the result is not
    /// acyclic.
    pub fn from_run_lists<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [TaskName])>,
    {
        let entries: Vec<(&str, &[TaskName])> = entries.into_iter().collect();

        let mut order = Vec::with_capacity(entries.len());
        let mut nodes: HashMap<TaskName, DagNode> = HashMap::with_capacity(entries.len());

        // First pass: nodes.
        for (name, _) in &entries {
            if nodes.insert(name.to_string(), DagNode::default()).is_none() {
                order.push(name.to_string());
            }
        }

        // Second pass: edges, in declaration order.
        for (name, run) in &entries {
            for next in run.iter() {
                if !nodes.contains_key(next) {
                    return Err(BistroError::ConfigError(format!(
                        "task '{}' lists unknown task '{}' in `run`",
                        name, next
                    )));
                }

                if let Some(node) = nodes.get_mut(*name) {
                    if node.dependents.contains(next) {
                        continue;
                    }
                    node.dependents.push(next.clone());
                }
                if let Some(node) = nodes.get_mut(next) {
                    node.deps.push(name.to_string());
                }
            }
        }

        let graph = Self { order, nodes };
        graph.ensure_acyclic()?;

        debug!(tasks = graph.order.len(), "built task dependency graph");
        Ok(graph)
    }

    fn ensure_acyclic(&self) -> Result<()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for name in &self.order {
            graph.add_node(name.as_str());
        }

        for name in &self.order {
            for next in self.dependents_of(name) {
                if next == name {
                    return Err(BistroError::DagCycle(format!(
                        "task '{}' lists itself in `run`",
                        name
                    )));
                }
                graph.add_edge(name.as_str(), next.as_str(), ());
            }
        }

        // A topological sort will fail if there is a cycle.
        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => {
                let node = cycle.node_id();
                Err(BistroError::DagCycle(format!(
                    "cycle detected in task graph involving task '{}'",
                    node
                )))
            }
        }
    }

    /// Return all task names, in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Immediate dependencies of a task (tasks that list it in their `run`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (its own `run` list).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Topological order of every task: each task appears after all tasks
    /// that must run before it.
    ///
    /// Depth-first post-order along dependency edges, started from every task
    /// nothing depends on, visited in insertion order.
    pub fn overall_order(&self) -> Vec<TaskName> {
        let mut visited = HashSet::new();
        let mut result = Vec::with_capacity(self.order.len());

        for name in &self.order {
            if self.dependents_of(name).is_empty() {
                self.visit(name, &|n| n.deps.as_slice(), &mut visited, &mut result);
            }
        }

        result
    }

    /// Every task that (transitively) depends on `name`, ordered so that each
    /// one comes after the dependants it depends on itself.
    pub fn dependants_of(&self, name: &str) -> Result<Vec<TaskName>> {
        if !self.contains(name) {
            return Err(BistroError::TaskNotFound(name.to_string()));
        }

        let mut visited = HashSet::new();
        let mut result = Vec::new();
        self.visit(name, &|n| n.dependents.as_slice(), &mut visited, &mut result);

        result.retain(|n| n != name);
        result.reverse();
        Ok(result)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        edges: &dyn Fn(&'a DagNode) -> &'a [TaskName],
        visited: &mut HashSet<&'a str>,
        result: &mut Vec<TaskName>,
    ) {
        if !visited.insert(name) {
            return;
        }

        if let Some(node) = self.nodes.get(name) {
            for next in edges(node) {
                self.visit(next, edges, visited, result);
            }
        }

        result.push(name.to_string());
    }
}
