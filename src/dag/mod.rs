// src/dag/mod.rs

//! Task dependency graph.
//!
//! [`graph`] holds the static DAG built from each task's `run` list and
//! answers the two ordering queries the orchestrator needs: the startup
//! order of every task and the cascade order after a single task changed.

pub mod graph;

pub use graph::DependencyGraph;
