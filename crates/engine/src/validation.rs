// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural validation of a submitted Execution, run before a graph is
//! built for it.

use crate::builder::build_graph;
use crate::error::EngineError;
use genedag_core::{Condition, DependType, Execution, Task, VarsIterEntry};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

// DNS-1123 label
#[allow(clippy::expect_used)]
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("constant regex pattern is valid")
});

const NAME_MAX_LEN: usize = 63;

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::Validation(message.into())
}

/// Validate an Execution before building its graph.
pub fn validate_execution(execution: &Execution) -> Result<(), EngineError> {
    let name = &execution.metadata.name;
    if name.len() > NAME_MAX_LEN || !NAME_PATTERN.is_match(name) {
        return Err(invalid(format!("execution name {name:?} is not a DNS-1123 label")));
    }
    if execution.spec.parallelism.is_some_and(|p| p < 0) {
        return Err(invalid("parallelism must be greater than or equal to 0"));
    }
    if execution.spec.tasks.is_empty() {
        return Err(invalid("tasks of execution must not be empty"));
    }

    let mut names = HashSet::new();
    for task in &execution.spec.tasks {
        if !names.insert(task.name.as_str()) {
            return Err(invalid(format!("duplicate task name {:?}", task.name)));
        }
        validate_task(task, execution)?;
    }

    let graph = build_graph(execution);
    if let Some(cycle) = graph.find_cycle() {
        return Err(invalid(format!(
            "dependents of execution form a cycle: {}",
            cycle.join("->")
        )));
    }

    Ok(())
}

fn validate_task(task: &Task, execution: &Execution) -> Result<(), EngineError> {
    if task.name.is_empty() {
        return Err(invalid("task name must not be empty"));
    }
    if task.image.is_empty() {
        return Err(invalid(format!("task {}: image must not be empty", task.name)));
    }
    if task.command_set.is_empty() && !task.is_dynamic() {
        return Err(invalid(format!(
            "task {}: commandSet must not be empty",
            task.name
        )));
    }
    if task.parallelism.is_some_and(|p| p < 0) {
        return Err(invalid(format!(
            "task {}: parallelism must be greater than or equal to 0",
            task.name
        )));
    }
    if task.backoff_limit.is_some_and(|b| b < 0) {
        return Err(invalid(format!(
            "task {}: backoffLimit must be greater than or equal to 0",
            task.name
        )));
    }
    if task.active_deadline_seconds.is_some_and(|d| d < 0) {
        return Err(invalid(format!(
            "task {}: activeDeadlineSeconds must be greater than or equal to 0",
            task.name
        )));
    }

    for dependent in &task.dependents {
        if dependent.target.is_empty() {
            return Err(invalid(format!(
                "task {}: dependent target must not be empty",
                task.name
            )));
        }
        let Some(target) = execution.task(&dependent.target) else {
            return Err(invalid(format!(
                "task {}: dependent target {} does not exist",
                task.name, dependent.target
            )));
        };
        // iterate pairs jobs one-to-one, so the counts must agree
        if dependent.depend_type == DependType::Iterate
            && !task.is_dynamic()
            && !target.is_dynamic()
            && task.command_set.len() != target.command_set.len()
        {
            return Err(invalid(format!(
                "task {}: iterate dependency on {} pairs {} jobs with {}",
                task.name,
                dependent.target,
                task.command_set.len(),
                target.command_set.len()
            )));
        }
    }

    if let Some(Condition::CheckResult { job, .. }) = &task.condition {
        validate_result_target(task, job, "check_result", execution)?;
    }
    if let Some(generic) = &task.generic_condition {
        validate_result_target(task, &generic.depend_job_name, "generic_condition", execution)?;
    }
    if let Some(iter) = &task.commands_iter {
        for entry in &iter.vars_iter {
            if let VarsIterEntry::GetResult { job, .. } = entry {
                validate_result_target(task, job, "get_result", execution)?;
            }
        }
    }

    Ok(())
}

/// The producer a result expression reads from must exist, map to a single
/// container job, and be reached through a `whole` dependency.
fn validate_result_target(
    task: &Task,
    target: &str,
    func: &str,
    execution: &Execution,
) -> Result<(), EngineError> {
    let Some(producer) = execution.task(target) else {
        return Err(invalid(format!(
            "task {}: {func} target {target} does not exist",
            task.name
        )));
    };
    let producer_jobs = if producer.is_dynamic() {
        1
    } else {
        producer.command_set.len()
    };
    if producer_jobs > 1 {
        return Err(invalid(format!(
            "task {}: {func} target {target} produces more than one job",
            task.name
        )));
    }
    let has_whole_dependency = task
        .dependents
        .iter()
        .any(|d| d.target == target && d.depend_type == DependType::Whole);
    if !has_whole_dependency {
        return Err(invalid(format!(
            "task {}: {func} target {target} must be a whole dependency",
            task.name
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
