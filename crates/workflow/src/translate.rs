// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translation of an instantiated workflow into an Execution resource.

use crate::instantiate::InstantiatedWorkflow;
use crate::model::Input;
use genedag_core::{
    to_display_string, DependType, Dependent, Execution, ExecutionSpec, ObjectMeta, Quantity,
    QuantityError, ResourceRequirements, Task, TaskType, Volume, VolumeSource,
};
use indexmap::IndexMap;

/// Default cluster-wide parallelism attached to submitted executions.
const DEFAULT_PARALLELISM: i64 = 5;

/// Errors raised while translating a workflow.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("workflow.{job}.resources.cpu: {source}")]
    Cpu {
        job: String,
        source: QuantityError,
    },
    #[error("workflow.{job}.resources.memory: {source}")]
    Memory {
        job: String,
        source: QuantityError,
    },
    #[error("workflow.{job}.depends[{index}].type: {value} is not a dependency type")]
    DependType {
        job: String,
        index: usize,
        value: String,
    },
}

/// Namespace the execution is submitted to: the `namespace` input, or
/// `default`.
pub fn execution_namespace(inputs: &IndexMap<String, Input>) -> String {
    string_input(inputs, "namespace").unwrap_or_else(|| "default".to_string())
}

/// Name of the execution: the `executionName` input, or a generated one.
pub fn execution_name(inputs: &IndexMap<String, Input>) -> String {
    string_input(inputs, "executionName").unwrap_or_else(generated_execution_name)
}

fn generated_execution_name() -> String {
    let stamp = chrono::Utc::now().format("%Y-%m%d-%H%M%S");
    let nonce: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect();
    format!("execution-{stamp}-{nonce}")
}

fn string_input(inputs: &IndexMap<String, Input>, key: &str) -> Option<String> {
    inputs
        .get(key)
        .and_then(|input| input.value.as_ref())
        .map(to_display_string)
        .filter(|value| !value.is_empty())
}

/// Produce one Task per workflow job and wrap them in an Execution.
pub fn to_execution(
    workflow: &InstantiatedWorkflow,
    namespace: &str,
    name: &str,
) -> Result<Execution, TranslateError> {
    let volumes: IndexMap<String, Volume> = workflow
        .volumes
        .iter()
        .map(|(key, volume)| {
            (
                key.clone(),
                Volume {
                    mount_path: volume.mount_path.clone(),
                    mount_from: VolumeSource {
                        pvc: volume.mount_from.pvc.clone(),
                    },
                },
            )
        })
        .collect();

    let mut tasks = Vec::with_capacity(workflow.jobs.len());
    for (job_name, job) in &workflow.jobs {
        let cpu = if job.cpu.is_empty() {
            Quantity::default()
        } else {
            job.cpu
                .trim_end_matches(['c', 'C'])
                .parse()
                .map_err(|source| TranslateError::Cpu {
                    job: job_name.clone(),
                    source,
                })?
        };
        let memory = if job.memory.is_empty() {
            Quantity::default()
        } else {
            job.memory.parse().map_err(|source| TranslateError::Memory {
                job: job_name.clone(),
                source,
            })?
        };

        let mut dependents = Vec::with_capacity(job.depends.len());
        for (index, depend) in job.depends.iter().enumerate() {
            let depend_type = match depend.depend_type.as_str() {
                "whole" => DependType::Whole,
                "iterate" => DependType::Iterate,
                other => {
                    return Err(TranslateError::DependType {
                        job: job_name.clone(),
                        index,
                        value: other.to_string(),
                    })
                }
            };
            dependents.push(Dependent {
                target: depend.target.clone(),
                depend_type,
            });
        }

        tasks.push(Task {
            name: job_name.clone(),
            task_type: TaskType::Job,
            command_set: job.commands.clone(),
            commands_iter: job.commands_iter.clone(),
            image: job.image.clone(),
            volumes: volumes.clone(),
            resources: ResourceRequirements { cpu, memory },
            dependents,
            condition: job.condition.clone(),
            generic_condition: job.generic_condition.clone(),
            ..Task::default()
        });
    }

    Ok(Execution {
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..ObjectMeta::default()
        },
        spec: ExecutionSpec {
            tasks,
            parallelism: Some(DEFAULT_PARALLELISM),
            ..ExecutionSpec::default()
        },
        ..Execution::default()
    })
}

#[cfg(test)]
#[path = "translate_tests.rs"]
mod tests;
