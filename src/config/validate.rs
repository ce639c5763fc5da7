// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, TaskKind};
use crate::dag::graph::find_cycle;
use crate::errors::{Result, TaskgraphError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.variables, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_kinds(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskgraphError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let section = &cfg.config;

    if section.suspend_threshold == 0 {
        return Err(TaskgraphError::ConfigError(
            "[config].suspend_threshold must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(resume) = section.resume_threshold {
        if resume > section.suspend_threshold {
            return Err(TaskgraphError::ConfigError(format!(
                "[config].resume_threshold ({}) must not exceed suspend_threshold ({})",
                resume, section.suspend_threshold
            )));
        }
    }

    Ok(())
}

fn validate_task_kinds(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if TaskKind::parse(&task.kind).is_none() {
            return Err(TaskgraphError::UnknownTaskKind {
                task: name.clone(),
                kind: task.kind.clone(),
            });
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(TaskgraphError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(TaskgraphError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let nodes = cfg.task.keys().map(String::as_str);
    let edges = cfg.task.iter().flat_map(|(name, task)| {
        task.after
            .iter()
            .map(move |dep| (dep.as_str(), name.as_str()))
    });

    match find_cycle(nodes, edges) {
        None => Ok(()),
        Some(node) => Err(TaskgraphError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            node
        ))),
    }
}
