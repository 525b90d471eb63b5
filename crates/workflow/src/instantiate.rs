// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow instantiation: merge inputs, resolve tools and expand
//! templated commands into concrete command lists.

use crate::model::{Input, Tool, Volume, Workflow};
use crate::validate::value_matches_type;
use genedag_core::{
    cartesian_product, expand_range, is_get_result_call, is_range_call, is_variant,
    parse_check_result_call, parse_get_result_call, parse_range_call, render_commands,
    replace_variant, to_display_string, variant_name, Condition, ExprError, GenericCondition,
    VarsIterEntry,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while instantiating a workflow.
#[derive(Debug, Error)]
pub enum InstantiateError {
    #[error("inputs.{key}: type is {expected} but the given value is {value}")]
    InputTypeMismatch {
        key: String,
        expected: String,
        value: Value,
    },
    #[error("inputs.{key}: value is empty")]
    InputUnbound { key: String },
    #[error("workflow.{job}.tool [{tool}] does not exist in the tool repository")]
    ToolMissing { job: String, tool: String },
    #[error("{context}: cannot decode [{name}] as an array")]
    NotAnArray { context: String, name: String },
    #[error("{context}: entry is neither an array, an array variant nor a range call")]
    BadVarsEntry { context: String },
    #[error(
        "workflow.{job}: vars rows have {vars_len} columns but vars_iter produces {iter_len}"
    )]
    LengthMismatch {
        job: String,
        vars_len: usize,
        iter_len: usize,
    },
    #[error("{context}: rows have inconsistent lengths ({first} vs {other})")]
    RaggedRows {
        context: String,
        first: usize,
        other: usize,
    },
    #[error("workflow.{job}.condition: {value} does not resolve to a bool")]
    BadCondition { job: String, value: Value },
    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// A job with its commands expanded (or deferred) and its tool resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstantiatedJob {
    pub description: String,
    pub tool: String,
    pub image: String,
    /// Cpu string with its suffix uppercased, empty when unset.
    pub cpu: String,
    /// Memory string with its suffix uppercased, empty when unset.
    pub memory: String,
    pub commands: Vec<String>,
    /// Present only when expansion is deferred on upstream output.
    pub commands_iter: Option<genedag_core::CommandsIter>,
    pub depends: Vec<crate::model::Depend>,
    pub condition: Option<Condition>,
    pub generic_condition: Option<GenericCondition>,
}

/// A workflow after input merging, tool resolution and expansion.
#[derive(Debug, Clone, Default)]
pub struct InstantiatedWorkflow {
    pub inputs: IndexMap<String, Input>,
    pub volumes: IndexMap<String, Volume>,
    pub jobs: IndexMap<String, InstantiatedJob>,
    /// Output artifact paths, fully substituted.
    pub outputs: IndexMap<String, Vec<String>>,
}

/// Merge user-supplied values over declared inputs.
///
/// Every declared input must end up bound; unknown user inputs are kept
/// and typed by inference.
pub fn merge_inputs(
    declared: &IndexMap<String, Input>,
    supplied: &HashMap<String, Value>,
) -> Result<IndexMap<String, Input>, InstantiateError> {
    let mut merged = IndexMap::with_capacity(declared.len());
    for (key, input) in declared {
        let mut input = input.clone();
        if input.value.is_none() {
            input.value = input.default.clone();
        }
        if let Some(value) = supplied.get(key) {
            if !value_matches_type(value, &input.input_type) {
                return Err(InstantiateError::InputTypeMismatch {
                    key: key.clone(),
                    expected: input.input_type.clone(),
                    value: value.clone(),
                });
            }
            input.value = Some(value.clone());
        }
        if input.value.is_none() {
            return Err(InstantiateError::InputUnbound { key: key.clone() });
        }
        merged.insert(key.clone(), input);
    }

    for (key, value) in supplied {
        if !declared.contains_key(key) {
            merged.insert(
                key.clone(),
                Input {
                    value: Some(value.clone()),
                    input_type: inferred_type(value),
                    ..Input::default()
                },
            );
        }
    }

    Ok(merged)
}

fn inferred_type(value: &Value) -> String {
    match value {
        Value::Number(_) => crate::model::NUMBER_TYPE,
        Value::Bool(_) => crate::model::BOOL_TYPE,
        Value::Array(_) => crate::model::ARRAY_TYPE,
        _ => crate::model::STRING_TYPE,
    }
    .to_string()
}

/// Flatten bound inputs into the substitution map for `${name}` references.
pub fn inputs_to_replace_data(inputs: &IndexMap<String, Input>) -> HashMap<String, String> {
    inputs
        .iter()
        .filter_map(|(key, input)| {
            input
                .value
                .as_ref()
                .map(|value| (key.clone(), replace_value_string(value)))
        })
        .collect()
}

/// Array inputs keep their JSON form so array variants can be decoded
/// back; scalars use their display form.
fn replace_value_string(value: &Value) -> String {
    match value {
        Value::Array(_) => value.to_string(),
        other => to_display_string(other),
    }
}

/// Instantiate a validated workflow against user inputs and a tool map.
pub fn instantiate_workflow(
    workflow: &Workflow,
    supplied: &HashMap<String, Value>,
    tools: &HashMap<String, Tool>,
) -> Result<InstantiatedWorkflow, InstantiateError> {
    let inputs = merge_inputs(&workflow.inputs, supplied)?;
    let data = inputs_to_replace_data(&inputs);

    let mut volumes = IndexMap::with_capacity(workflow.volumes.len());
    for (key, volume) in &workflow.volumes {
        let mut volume = volume.clone();
        volume.mount_path = replace_variant(&volume.mount_path, &data);
        volume.mount_from.pvc = replace_variant(&volume.mount_from.pvc, &data);
        volumes.insert(key.clone(), volume);
    }

    let mut jobs = IndexMap::with_capacity(workflow.jobs.len());
    for (job_name, job) in &workflow.jobs {
        let tool = tools
            .get(&job.tool)
            .ok_or_else(|| InstantiateError::ToolMissing {
                job: job_name.clone(),
                tool: job.tool.clone(),
            })?;

        let mut instantiated = InstantiatedJob {
            description: job.description.clone(),
            tool: job.tool.clone(),
            image: tool.image.clone(),
            cpu: job.resources.cpu.to_uppercase(),
            memory: job.resources.memory.to_uppercase(),
            depends: job.depends.clone(),
            generic_condition: job.generic_condition.clone(),
            ..InstantiatedJob::default()
        };

        if job.commands.is_empty() && job.commands_iter.is_empty() && !tool.command.is_empty() {
            instantiated.commands.push(tool.command.clone());
        }

        let mut commands: Vec<String> = job
            .commands
            .iter()
            .map(|command| replace_variant(command, &data))
            .collect();

        let context = format!("workflow.{job_name}.commands_iter.vars");
        let vars = instantiate_vars(&context, &job.commands_iter.vars, &data)?;
        let vars_width = row_width(&context, &vars)?;

        let context = format!("workflow.{job_name}.commands_iter.vars_iter");
        let axes = instantiate_vars_iter(&context, &job.commands_iter.vars_iter, &data)?;
        let deferred = axes
            .iter()
            .any(|entry| matches!(entry, VarsIterEntry::GetResult { .. }));

        let command_template = replace_variant(&job.commands_iter.command, &data);

        if deferred {
            // expansion happens after the upstream job completes
            instantiated.commands.append(&mut commands);
            instantiated.commands_iter = Some(genedag_core::CommandsIter {
                command: command_template,
                vars,
                vars_iter: axes,
            });
        } else {
            let resolved: Vec<Vec<Value>> = axes
                .into_iter()
                .map(|entry| match entry {
                    VarsIterEntry::List(values) => values,
                    VarsIterEntry::GetResult { .. } => Vec::new(),
                })
                .collect();
            if vars_width != 0 && !resolved.is_empty() && resolved.len() != vars_width {
                return Err(InstantiateError::LengthMismatch {
                    job: job_name.clone(),
                    vars_len: vars_width,
                    iter_len: resolved.len(),
                });
            }
            let mut rows = vars;
            rows.extend(cartesian_product(&resolved));
            if !job.commands_iter.command.is_empty() {
                commands.extend(render_commands(&command_template, &rows));
            }
            instantiated.commands.append(&mut commands);
        }

        instantiated.condition = instantiate_condition(job_name, job.condition.as_ref(), &data)?;
        jobs.insert(job_name.clone(), instantiated);
    }

    let mut outputs = IndexMap::with_capacity(workflow.outputs.len());
    for (name, output) in &workflow.outputs {
        let mut paths: Vec<String> = output
            .paths
            .iter()
            .map(|path| replace_variant(path, &data))
            .collect();

        let context = format!("outputs.{name}.paths_iter.vars");
        let vars = instantiate_vars(&context, &output.paths_iter.vars, &data)?;
        let vars_width = row_width(&context, &vars)?;

        let context = format!("outputs.{name}.paths_iter.vars_iter");
        let axes = instantiate_vars(&context, &output.paths_iter.vars_iter, &data)?;
        if vars_width != 0 && !axes.is_empty() && axes.len() != vars_width {
            return Err(InstantiateError::LengthMismatch {
                job: name.clone(),
                vars_len: vars_width,
                iter_len: axes.len(),
            });
        }

        let mut rows = vars;
        rows.extend(cartesian_product(&axes));
        if !output.paths_iter.path.is_empty() {
            let path_template = replace_variant(&output.paths_iter.path, &data);
            paths.extend(render_commands(&path_template, &rows));
        }
        outputs.insert(name.clone(), paths);
    }

    Ok(InstantiatedWorkflow {
        inputs,
        volumes,
        jobs,
        outputs,
    })
}

/// Instantiate a `vars` row list: each entry becomes one row of
/// positional parameters.
fn instantiate_vars(
    context: &str,
    vars: &[Value],
    data: &HashMap<String, String>,
) -> Result<Vec<Vec<Value>>, InstantiateError> {
    let mut rows = Vec::with_capacity(vars.len());
    for (i, entry) in vars.iter().enumerate() {
        let context = format!("{context}[{i}]");
        rows.push(instantiate_row(&context, entry, data)?);
    }
    Ok(rows)
}

/// Instantiate a `vars_iter` axis list, preserving deferred axes.
fn instantiate_vars_iter(
    context: &str,
    vars_iter: &[Value],
    data: &HashMap<String, String>,
) -> Result<Vec<VarsIterEntry>, InstantiateError> {
    let mut entries = Vec::with_capacity(vars_iter.len());
    for (i, entry) in vars_iter.iter().enumerate() {
        let context = format!("{context}[{i}]");
        if let Value::String(text) = entry {
            if is_get_result_call(text) {
                if let Some((job, sep)) = parse_get_result_call(text) {
                    entries.push(VarsIterEntry::GetResult {
                        job,
                        sep: replace_variant(&sep, data),
                    });
                    continue;
                }
            }
        }
        entries.push(VarsIterEntry::List(instantiate_row(&context, entry, data)?));
    }
    Ok(entries)
}

/// Resolve one row/axis entry into concrete values.
fn instantiate_row(
    context: &str,
    entry: &Value,
    data: &HashMap<String, String>,
) -> Result<Vec<Value>, InstantiateError> {
    match entry {
        Value::String(text) if is_range_call(text) => {
            let call = parse_range_call(text).ok_or_else(|| InstantiateError::BadVarsEntry {
                context: context.to_string(),
            })?;
            Ok(expand_range(context, &call, data)?)
        }
        Value::String(text) => {
            let name = variant_name(text).unwrap_or(text.as_str());
            let encoded = data.get(name).cloned().unwrap_or_default();
            let decoded: Value = serde_json::from_str(&encoded).map_err(|_| {
                InstantiateError::NotAnArray {
                    context: context.to_string(),
                    name: name.to_string(),
                }
            })?;
            match decoded {
                Value::Array(values) => Ok(values),
                _ => Err(InstantiateError::NotAnArray {
                    context: context.to_string(),
                    name: name.to_string(),
                }),
            }
        }
        Value::Array(elements) => Ok(elements
            .iter()
            .map(|element| match element {
                Value::String(text) => Value::from(replace_variant(text, data)),
                other => other.clone(),
            })
            .collect()),
        _ => Err(InstantiateError::BadVarsEntry {
            context: context.to_string(),
        }),
    }
}

/// All rows must have the same number of columns; returns that width.
fn row_width(context: &str, rows: &[Vec<Value>]) -> Result<usize, InstantiateError> {
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    for row in rows {
        if row.len() != first.len() {
            return Err(InstantiateError::RaggedRows {
                context: context.to_string(),
                first: first.len(),
                other: row.len(),
            });
        }
    }
    Ok(first.len())
}

/// Resolve an authoring condition into its tagged form.
fn instantiate_condition(
    job_name: &str,
    condition: Option<&Value>,
    data: &HashMap<String, String>,
) -> Result<Option<Condition>, InstantiateError> {
    let Some(condition) = condition else {
        return Ok(None);
    };
    match condition {
        Value::Bool(b) => Ok(Some(Condition::Bool(*b))),
        Value::String(text) if is_variant(text) => {
            match replace_variant(text, data).as_str() {
                "true" => Ok(Some(Condition::Bool(true))),
                "false" => Ok(Some(Condition::Bool(false))),
                _ => Err(InstantiateError::BadCondition {
                    job: job_name.to_string(),
                    value: condition.clone(),
                }),
            }
        }
        Value::String(text) => match parse_check_result_call(text) {
            Some((job, expected)) => Ok(Some(Condition::CheckResult {
                job,
                expected: replace_variant(&expected, data),
            })),
            None => Err(InstantiateError::BadCondition {
                job: job_name.to_string(),
                value: condition.clone(),
            }),
        },
        other => Err(InstantiateError::BadCondition {
            job: job_name.to_string(),
            value: other.clone(),
        }),
    }
}

#[cfg(test)]
#[path = "instantiate_tests.rs"]
mod tests;
