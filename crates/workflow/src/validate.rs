// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow validation.
//!
//! Validation aggregates every finding into a list instead of stopping at
//! the first; a submission is rejected as a whole or accepted as a whole.

use crate::model::{
    CommandsIter, Depend, Input, JobInfo, PathsIter, Resources, Workflow, ARRAY_TYPE, BOOL_TYPE,
    INPUT_TYPES, NUMBER_TYPE, STRING_TYPE,
};
use genedag_core::{
    is_check_result_call, is_get_result_call, is_range_call, is_variant, parse_check_result_call,
    parse_get_result_call, parse_range_call, variant_name, GenericCondition, MatchOperator,
    VAR_PATTERN,
};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

/// Job names double as DNS label fragments in container-job names.
const JOB_NAME_MAX_LEN: usize = 40;

#[allow(clippy::expect_used)]
static JOB_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[a-z]([-a-z0-9]*[a-z0-9])?$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static CPU_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(\.\d+)?[cC]?$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static MEMORY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(\.\d+)?[gG]?$").expect("constant regex pattern is valid")
});

/// One validation finding, anchored to a document location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub location: String,
    pub message: String,
}

impl ValidationError {
    fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a whole workflow document, returning every finding.
pub fn validate_workflow(workflow: &Workflow) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if workflow.jobs.is_empty() {
        errors.push(ValidationError::new("workflow", "no job defined"));
        return errors;
    }

    validate_inputs(&workflow.inputs, &mut errors);

    for (job_name, job) in &workflow.jobs {
        validate_job_name(job_name, &mut errors);
        validate_resources(job_name, &job.resources, &mut errors);
        validate_tool_ref(job_name, &job.tool, &mut errors);
        validate_commands(job_name, &job.commands, &workflow.inputs, &mut errors);
        validate_commands_iter(job_name, job, workflow, &mut errors);
        validate_depends(job_name, &job.depends, &workflow.jobs, &mut errors);
        validate_condition(job_name, job, workflow, &mut errors);
        validate_generic_condition(job_name, job.generic_condition.as_ref(), workflow, &mut errors);
    }

    if let Some(err) = validate_depends_cycle(&workflow.jobs) {
        errors.push(err);
    }

    validate_volumes(workflow, &mut errors);
    validate_outputs(workflow, &mut errors);

    errors
}

fn validate_inputs(inputs: &IndexMap<String, Input>, errors: &mut Vec<ValidationError>) {
    for (key, input) in inputs {
        let location = format!("inputs.{key}");
        if !INPUT_TYPES.contains(&input.input_type.as_str()) {
            errors.push(ValidationError::new(
                format!("{location}.type"),
                format!(
                    "[{}] is an invalid type, valid types: {INPUT_TYPES:?}",
                    input.input_type
                ),
            ));
            continue;
        }
        if let Some(default) = &input.default {
            if !value_matches_type(default, &input.input_type) {
                errors.push(ValidationError::new(
                    location,
                    format!(
                        "type is {} but the default value is {default}",
                        input.input_type
                    ),
                ));
            }
        }
    }
}

/// True when a JSON value conforms to a declared input type.
pub(crate) fn value_matches_type(value: &Value, input_type: &str) -> bool {
    match value {
        Value::Number(_) => input_type == NUMBER_TYPE,
        Value::Bool(_) => input_type == BOOL_TYPE,
        Value::String(_) => input_type == STRING_TYPE,
        Value::Array(_) => input_type == ARRAY_TYPE,
        _ => false,
    }
}

fn validate_job_name(job_name: &str, errors: &mut Vec<ValidationError>) {
    let location = format!("workflow.{job_name}");
    if job_name.len() > JOB_NAME_MAX_LEN {
        errors.push(ValidationError::new(
            location.clone(),
            format!("job name is more than {JOB_NAME_MAX_LEN} characters"),
        ));
    }
    if !JOB_NAME_PATTERN.is_match(job_name) {
        errors.push(ValidationError::new(
            location,
            "job name must consist of lower case alphanumeric characters or '-', \
             and must start and end with an alphanumeric character",
        ));
    }
}

fn validate_resources(job_name: &str, resources: &Resources, errors: &mut Vec<ValidationError>) {
    let location = format!("workflow.{job_name}.resources");
    if !resources.cpu.is_empty() && !CPU_PATTERN.is_match(&resources.cpu) {
        errors.push(ValidationError::new(
            format!("{location}.cpu"),
            format!("{} is illegal", resources.cpu),
        ));
    }
    if !resources.memory.is_empty() && !MEMORY_PATTERN.is_match(&resources.memory) {
        errors.push(ValidationError::new(
            format!("{location}.memory"),
            format!("{} is illegal", resources.memory),
        ));
    }
}

fn validate_tool_ref(job_name: &str, tool: &str, errors: &mut Vec<ValidationError>) {
    let location = format!("workflow.{job_name}.tool");
    if tool.is_empty() {
        errors.push(ValidationError::new(location, "should not be empty"));
    } else if is_variant(tool) {
        errors.push(ValidationError::new(location, "should not be a variant"));
    }
}

fn validate_commands(
    job_name: &str,
    commands: &[String],
    inputs: &IndexMap<String, Input>,
    errors: &mut Vec<ValidationError>,
) {
    for (i, command) in commands.iter().enumerate() {
        let location = format!("workflow.{job_name}.commands[{i}]");
        validate_template(command, &location, inputs, errors);
    }
}

/// Check every `${...}` reference in a template: `item` and positional
/// indices are accepted, anything else must name a declared input.
/// Returns the largest positional index seen.
fn validate_template(
    template: &str,
    location: &str,
    inputs: &IndexMap<String, Input>,
    errors: &mut Vec<ValidationError>,
) -> usize {
    let mut max_index = 0;
    for caps in VAR_PATTERN.captures_iter(template) {
        let name = &caps[1];
        if name == "item" {
            continue;
        }
        if let Ok(index) = name.parse::<usize>() {
            max_index = max_index.max(index);
            continue;
        }
        if !inputs.contains_key(name) {
            errors.push(ValidationError::new(
                location,
                format!("variant [{name}] undefined"),
            ));
        }
    }
    max_index
}

fn validate_commands_iter(
    job_name: &str,
    job: &JobInfo,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    let iter = &job.commands_iter;
    if iter.command.is_empty() && iter.is_empty() {
        return;
    }
    if iter.command.is_empty() {
        errors.push(ValidationError::new(
            format!("workflow.{job_name}.commands_iter"),
            "vars or vars_iter is not empty but command is empty",
        ));
        return;
    }
    if iter.is_empty() {
        errors.push(ValidationError::new(
            format!("workflow.{job_name}.commands_iter"),
            "command is not empty but vars and vars_iter are empty",
        ));
        return;
    }

    let location = format!("workflow.{job_name}.commands_iter.command");
    let max_index = validate_template(&iter.command, &location, &workflow.inputs, errors);
    if let Some(limit) = positional_limit(iter) {
        if max_index > limit {
            errors.push(ValidationError::new(
                location,
                format!("${{{max_index}}} is larger than the declared parameter columns"),
            ));
        }
    }

    let location = format!("workflow.{job_name}.commands_iter.vars");
    validate_vars_array(&location, &iter.vars, &workflow.inputs, errors);

    let location = format!("workflow.{job_name}.commands_iter.vars_iter");
    validate_vars_iter_array(&location, &iter.vars_iter, job_name, workflow, errors);
}

/// Upper bound for `${k}` references, when it is statically known: the
/// number of `vars_iter` axes, or the widest literal `vars` row when only
/// `vars` is declared.
fn positional_limit(iter: &CommandsIter) -> Option<usize> {
    if !iter.vars_iter.is_empty() {
        return Some(iter.vars_iter.len());
    }
    iter.vars
        .iter()
        .filter_map(|row| row.as_array().map(Vec::len))
        .max()
}

fn validate_vars_array(
    location: &str,
    vars: &[Value],
    inputs: &IndexMap<String, Input>,
    errors: &mut Vec<ValidationError>,
) {
    for (i, entry) in vars.iter().enumerate() {
        let location = format!("{location}[{i}]");
        validate_vars_entry(&location, entry, inputs, errors);
    }
}

fn validate_vars_iter_array(
    location: &str,
    vars_iter: &[Value],
    job_name: &str,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    for (i, entry) in vars_iter.iter().enumerate() {
        let location = format!("{location}[{i}]");
        if let Value::String(text) = entry {
            if text.starts_with("get_result") {
                if !is_get_result_call(text) {
                    errors.push(ValidationError::new(
                        location,
                        format!(
                            "get_result must be called as get_result(jobName, sep), got {text}"
                        ),
                    ));
                } else {
                    validate_get_result(&location, text, job_name, workflow, errors);
                }
                continue;
            }
        }
        validate_vars_entry(&location, entry, &workflow.inputs, errors);
    }
}

fn validate_vars_entry(
    location: &str,
    entry: &Value,
    inputs: &IndexMap<String, Input>,
    errors: &mut Vec<ValidationError>,
) {
    match entry {
        Value::String(text) => {
            if is_variant(text) {
                validate_variant(location, text, &[ARRAY_TYPE], inputs, errors);
            } else if text.starts_with("range") {
                if !is_range_call(text) {
                    errors.push(ValidationError::new(
                        location,
                        format!("range must be called as range(start, end, step), got {text}"),
                    ));
                } else {
                    validate_range(location, text, inputs, errors);
                }
            } else {
                errors.push(ValidationError::new(
                    location,
                    format!("entries must be arrays, array variants or range calls, got {text}"),
                ));
            }
        }
        Value::Array(elements) => {
            for (j, element) in elements.iter().enumerate() {
                let location = format!("{location}[{j}]");
                match element {
                    Value::String(text) if is_variant(text) => {
                        validate_variant(
                            &location,
                            text,
                            &[NUMBER_TYPE, STRING_TYPE, BOOL_TYPE],
                            inputs,
                            errors,
                        );
                    }
                    Value::Array(_) => {
                        errors.push(ValidationError::new(
                            location,
                            "the value type should not be array",
                        ));
                    }
                    _ => {}
                }
            }
        }
        other => {
            errors.push(ValidationError::new(
                location,
                format!("entries must be arrays, array variants or range calls, got {other}"),
            ));
        }
    }
}

fn validate_variant(
    location: &str,
    text: &str,
    allowed_types: &[&str],
    inputs: &IndexMap<String, Input>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(name) = variant_name(text) else {
        errors.push(ValidationError::new(location, format!("{text} is not a variant")));
        return;
    };
    match inputs.get(name) {
        None => errors.push(ValidationError::new(
            location,
            format!("the variant [{name}] is not defined in the inputs"),
        )),
        Some(input) if !allowed_types.contains(&input.input_type.as_str()) => {
            errors.push(ValidationError::new(
                location,
                format!(
                    "the type of {name} can only be one of {allowed_types:?}, but is {}",
                    input.input_type
                ),
            ));
        }
        Some(_) => {}
    }
}

fn validate_range(
    location: &str,
    text: &str,
    inputs: &IndexMap<String, Input>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(call) = parse_range_call(text) else {
        errors.push(ValidationError::new(
            location,
            format!("range must be called as range(start, end, step), got {text}"),
        ));
        return;
    };
    let mut params = vec![call.start, call.end];
    if let Some(step) = call.step {
        params.push(step);
    }
    for param in params {
        if is_variant(&param) {
            validate_variant(location, &param, &[NUMBER_TYPE], inputs, errors);
        } else if param.parse::<f64>().is_err() {
            errors.push(ValidationError::new(
                location,
                format!("range parameters must be numbers or variants, got {param}"),
            ));
        }
    }
}

fn validate_depends(
    job_name: &str,
    depends: &[Depend],
    jobs: &IndexMap<String, JobInfo>,
    errors: &mut Vec<ValidationError>,
) {
    for (i, depend) in depends.iter().enumerate() {
        let location = format!("workflow.{job_name}.depends[{i}]");
        if is_variant(&depend.depend_type) {
            errors.push(ValidationError::new(
                format!("{location}.type"),
                "should not be a variant",
            ));
        }
        if depend.depend_type != "whole" && depend.depend_type != "iterate" {
            errors.push(ValidationError::new(
                format!("{location}.type"),
                "should only be iterate or whole",
            ));
        }
        if is_variant(&depend.target) {
            errors.push(ValidationError::new(
                format!("{location}.target"),
                "should not be a variant",
            ));
            continue;
        }
        if !jobs.contains_key(&depend.target) {
            errors.push(ValidationError::new(
                format!("{location}.target"),
                format!("[{}] does not exist", depend.target),
            ));
        }
    }
}

fn validate_condition(
    job_name: &str,
    job: &JobInfo,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    let Some(condition) = &job.condition else {
        return;
    };
    let location = format!("workflow.{job_name}.condition");
    match condition {
        Value::Bool(_) => {}
        Value::String(text) => {
            if is_variant(text) {
                validate_variant(&location, text, &[STRING_TYPE], &workflow.inputs, errors);
            } else if is_check_result_call(text) {
                validate_check_result(&location, text, job_name, workflow, errors);
            } else {
                errors.push(ValidationError::new(
                    location,
                    format!("invalid condition string {text}"),
                ));
            }
        }
        other => {
            errors.push(ValidationError::new(
                location,
                format!("condition must be a bool, variant or check_result call, got {other}"),
            ));
        }
    }
}

/// The producer a result function reads from must map to exactly one
/// container job: a single command and at most a single iteration row.
fn producer_has_single_job(job: &JobInfo) -> bool {
    job.commands.len() <= 1
        && job.commands_iter.vars.len() <= 1
        && job.commands_iter.vars_iter.len() <= 1
}

fn validate_check_result(
    location: &str,
    text: &str,
    job_name: &str,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    let Some((target, expected)) = parse_check_result_call(text) else {
        errors.push(ValidationError::new(
            location,
            format!("check_result must be called as check_result(jobName, exp), got {text}"),
        ));
        return;
    };
    if is_variant(&expected) {
        validate_variant(location, &expected, &[STRING_TYPE], &workflow.inputs, errors);
    }
    validate_result_dependency(location, "check_result", job_name, &target, workflow, errors);
}

fn validate_get_result(
    location: &str,
    text: &str,
    job_name: &str,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    let Some((target, _sep)) = parse_get_result_call(text) else {
        errors.push(ValidationError::new(
            location,
            format!("get_result must be called as get_result(jobName, sep), got {text}"),
        ));
        return;
    };
    validate_result_dependency(location, "get_result", job_name, &target, workflow, errors);
}

/// Shape constraints shared by `check_result`, `get_result` and generic
/// conditions: the target exists, produces a single container job, and the
/// referring job reaches it through a single `whole` dependency.
fn validate_result_dependency(
    location: &str,
    func: &str,
    job_name: &str,
    target: &str,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    let Some(target_job) = workflow.jobs.get(target) else {
        errors.push(ValidationError::new(
            location,
            format!("the {func} dependency job [{target}] does not exist"),
        ));
        return;
    };
    if !producer_has_single_job(target_job) {
        errors.push(ValidationError::new(
            location,
            format!("the {func} dependency job [{target}] has more than one command"),
        ));
    }
    let Some(current) = workflow.jobs.get(job_name) else {
        return;
    };
    if current.depends.len() != 1 {
        errors.push(ValidationError::new(
            location,
            format!("{func} requires a single dependency, found {}", current.depends.len()),
        ));
        return;
    }
    let depend = &current.depends[0];
    if depend.target != target || depend.depend_type != "whole" {
        errors.push(ValidationError::new(
            location,
            format!("the {func} dependency on [{target}] must be a whole dependency"),
        ));
    }
}

fn validate_generic_condition(
    job_name: &str,
    condition: Option<&GenericCondition>,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    let Some(condition) = condition else {
        return;
    };
    let location = format!("workflow.{job_name}.generic_condition.depend_job_name");
    validate_result_dependency(
        &location,
        "generic_condition",
        job_name,
        &condition.depend_job_name,
        workflow,
        errors,
    );

    for (i, rule) in condition.match_rules.iter().enumerate() {
        let location = format!("workflow.{job_name}.generic_condition.match_rules[{i}]");
        match rule.operator {
            MatchOperator::In
            | MatchOperator::NotIn
            | MatchOperator::Equal
            | MatchOperator::DoubleEqual
            | MatchOperator::NotEqual => {
                if rule.values.is_empty() {
                    errors.push(ValidationError::new(
                        format!("{location}.values"),
                        format!("must not be empty when operator is {}", rule.operator),
                    ));
                }
            }
            MatchOperator::Exists | MatchOperator::DoesNotExist => {
                if !rule.values.is_empty() {
                    errors.push(ValidationError::new(
                        format!("{location}.values"),
                        format!("must be empty when operator is {}", rule.operator),
                    ));
                }
            }
            MatchOperator::Gt | MatchOperator::Lt => {
                if rule.values.len() != 1 {
                    errors.push(ValidationError::new(
                        format!("{location}.values"),
                        format!("must hold a single value when operator is {}", rule.operator),
                    ));
                }
            }
        }
        if rule.key.is_empty() || is_variant(&rule.key) {
            errors.push(ValidationError::new(
                format!("{location}.key"),
                "must not be empty or a variant",
            ));
        }
    }
}

/// Depth-first search over the dependency edges with on-stack marking;
/// the first cycle found is reported with its path.
fn validate_depends_cycle(jobs: &IndexMap<String, JobInfo>) -> Option<ValidationError> {
    fn dfs(
        node: &str,
        jobs: &IndexMap<String, JobInfo>,
        visited: &mut IndexMap<String, bool>,
        stack: &mut Vec<String>,
    ) -> Option<String> {
        visited.insert(node.to_string(), true);
        stack.push(node.to_string());
        if let Some(job) = jobs.get(node) {
            for depend in &job.depends {
                let target = depend.target.as_str();
                if !visited.get(target).copied().unwrap_or(false) {
                    if let Some(cycle) = dfs(target, jobs, visited, stack) {
                        return Some(cycle);
                    }
                } else if let Some(start) = stack.iter().position(|n| n == target) {
                    let mut path: Vec<&str> =
                        stack[start..].iter().map(String::as_str).collect();
                    path.push(target);
                    return Some(path.join("->"));
                }
            }
        }
        stack.pop();
        None
    }

    let mut visited: IndexMap<String, bool> = IndexMap::new();
    for name in jobs.keys() {
        if visited.get(name.as_str()).copied().unwrap_or(false) {
            continue;
        }
        let mut stack = Vec::new();
        if let Some(cycle) = dfs(name, jobs, &mut visited, &mut stack) {
            return Some(ValidationError::new(
                "workflow.depends",
                format!("dependency cycle detected: {cycle}"),
            ));
        }
    }
    None
}

fn validate_volumes(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    for (key, volume) in &workflow.volumes {
        let pvc = &volume.mount_from.pvc;
        if pvc.is_empty() {
            errors.push(ValidationError::new(
                format!("volumes[{key}].mount_from.pvc"),
                "volumes only support pvc and it must not be empty",
            ));
            continue;
        }
        if is_variant(pvc) {
            validate_variant(
                &format!("volumes[{key}].mount_from.pvc"),
                pvc,
                &[STRING_TYPE],
                &workflow.inputs,
                errors,
            );
        }

        let mount_path = &volume.mount_path;
        if mount_path.is_empty() {
            errors.push(ValidationError::new(
                format!("volumes[{key}].mount_path"),
                "must not be empty",
            ));
        } else if is_variant(mount_path) {
            validate_variant(
                &format!("volumes[{key}].mount_path"),
                mount_path,
                &[STRING_TYPE],
                &workflow.inputs,
                errors,
            );
        } else if !mount_path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("volumes[{key}].mount_path"),
                format!("must be an absolute path, got {mount_path}"),
            ));
        }
    }
}

fn validate_outputs(workflow: &Workflow, errors: &mut Vec<ValidationError>) {
    for (name, output) in &workflow.outputs {
        for (i, path) in output.paths.iter().enumerate() {
            let location = format!("outputs.{name}.paths[{i}]");
            validate_template(path, &location, &workflow.inputs, errors);
        }
        validate_paths_iter(name, &output.paths_iter, workflow, errors);
    }
}

fn validate_paths_iter(
    name: &str,
    iter: &PathsIter,
    workflow: &Workflow,
    errors: &mut Vec<ValidationError>,
) {
    if iter.path.is_empty() && iter.is_empty() {
        return;
    }
    if iter.path.is_empty() {
        errors.push(ValidationError::new(
            format!("outputs.{name}.paths_iter"),
            "vars or vars_iter is not empty but path is empty",
        ));
        return;
    }
    if iter.is_empty() {
        errors.push(ValidationError::new(
            format!("outputs.{name}.paths_iter"),
            "path is not empty but vars and vars_iter are empty",
        ));
        return;
    }

    let location = format!("outputs.{name}.paths_iter.path");
    let max_index = validate_template(&iter.path, &location, &workflow.inputs, errors);
    if !iter.vars_iter.is_empty() && max_index > iter.vars_iter.len() {
        errors.push(ValidationError::new(
            location,
            format!("${{{max_index}}} is larger than the declared parameter columns"),
        ));
    }

    let location = format!("outputs.{name}.paths_iter.vars");
    validate_vars_array(&location, &iter.vars, &workflow.inputs, errors);

    let location = format!("outputs.{name}.paths_iter.vars_iter");
    validate_vars_array(&location, &iter.vars_iter, &workflow.inputs, errors);
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
