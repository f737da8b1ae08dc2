// src/config/validate.rs

use crate::config::model::{ConfigFile, FileTaskConfig, RawConfigFile, TaskSet};
use crate::dag::DependencyGraph;
use crate::engine::TaskName;
use crate::errors::{BistroError, Result};
use crate::watch::PatternMatcher;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BistroError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let tasks = parse_tasks(raw.task)?;
        ensure_has_tasks(&tasks)?;
        for (name, task) in &tasks {
            validate_pattern(name, &task.pattern)?;
        }
        DependencyGraph::from_run_lists(
            tasks.iter().map(|(name, task)| (name.as_str(), task.run.as_slice())),
        )?;
        Ok(ConfigFile::new_unchecked(raw.config, tasks))
    }
}

/// Check a programmatic task set and build its dependency graph.
///
/// Fails on invalid patterns, unknown `run` targets and cycles.
pub fn validate_task_set(tasks: &TaskSet) -> Result<DependencyGraph> {
    for (name, task) in tasks.iter() {
        validate_pattern(name, &task.pattern)?;
    }
    DependencyGraph::build(tasks)
}

fn parse_tasks(table: toml::Table) -> Result<Vec<(TaskName, FileTaskConfig)>> {
    table
        .into_iter()
        .map(|(name, value)| {
            let task: FileTaskConfig = value.try_into().map_err(|err| {
                BistroError::ConfigError(format!("task '{}': {}", name, err))
            })?;
            Ok((name, task))
        })
        .collect()
}

fn ensure_has_tasks(tasks: &[(TaskName, FileTaskConfig)]) -> Result<()> {
    if tasks.is_empty() {
        return Err(BistroError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_pattern(name: &str, pattern: &str) -> Result<()> {
    PatternMatcher::new(pattern).map_err(|err| {
        BistroError::ConfigError(format!(
            "task '{}' has an invalid pattern '{}': {:#}",
            name, pattern, err
        ))
    })?;
    Ok(())
}
