// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph construction from an Execution, and the registry that owns the
//! graphs of live executions.

use crate::graph::{Graph, JobInfo, Vertex};
use genedag_cluster::{ClusterJob, LABEL_CONTROLLER_UID};
use genedag_core::{DependType, Execution, Task};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Separator used to construct container-job names.
pub(crate) const SEPARATOR: char = '.';

/// Keyed map of the graphs the controller is currently driving.
///
/// Graphs are rebuilt from the Execution on controller restart, so losing
/// this map is never fatal.
#[derive(Default)]
pub struct GraphRegistry {
    graphs: RwLock<HashMap<String, Arc<RwLock<Graph>>>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and store the graph for an execution, replacing any prior one.
    pub fn add(&self, execution: &Execution) -> Arc<RwLock<Graph>> {
        let graph = Arc::new(RwLock::new(build_graph(execution)));
        self.graphs
            .write()
            .insert(execution.key(), Arc::clone(&graph));
        graph
    }

    pub fn get(&self, key: &str) -> Option<Arc<RwLock<Graph>>> {
        self.graphs.read().get(key).cloned()
    }

    pub fn delete(&self, key: &str) {
        self.graphs.write().remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.graphs.read().contains_key(key)
    }
}

/// Build the vertex-per-container-job graph for an execution.
///
/// Tasks with a deferred `commands_iter` contribute a single placeholder
/// vertex named `{execution}.{task}.` (no index); everything else gets one
/// vertex per command named `{execution}.{task}.{index}`.
pub fn build_graph(execution: &Execution) -> Graph {
    let mut vertices = Vec::new();
    for task in &execution.spec.tasks {
        let prefix = format!(
            "{}{SEPARATOR}{}{SEPARATOR}",
            execution.metadata.name, task.name
        );
        if task.is_dynamic() {
            let job = new_job(&prefix, "", execution, task);
            vertices.push(Vertex::new(
                JobInfo {
                    job,
                    finished: false,
                    task_type: task.task_type,
                    dynamic_task: Some(task.clone()),
                },
                true,
            ));
        } else {
            for (index, command) in task.command_set.iter().enumerate() {
                let name = format!("{prefix}{index}");
                let job = new_job(&name, command, execution, task);
                vertices.push(Vertex::new(
                    JobInfo {
                        job,
                        finished: false,
                        task_type: task.task_type,
                        dynamic_task: None,
                    },
                    false,
                ));
            }
        }
    }

    let mut graph = Graph::new(vertices);

    // wire edges task by task
    let positions: Vec<(String, String)> = (0..graph.len())
        .map(|index| {
            let name = graph.vertex(index).map(Vertex::job_name).unwrap_or("");
            name_parts(name)
        })
        .collect();

    for (child_index, (child_task, child_suffix)) in positions.iter().enumerate() {
        let Some(task) = execution.spec.tasks.iter().find(|t| &t.name == child_task) else {
            continue;
        };
        for dependent in &task.dependents {
            for (parent_index, (parent_task, parent_suffix)) in positions.iter().enumerate() {
                if parent_task != &dependent.target {
                    continue;
                }
                match dependent.depend_type {
                    DependType::Whole => graph.add_edge(parent_index, child_index),
                    DependType::Iterate => {
                        if parent_suffix == child_suffix {
                            graph.add_edge(parent_index, child_index);
                        }
                    }
                }
            }
        }
    }

    graph
}

/// `{execution}.{task}.{index}` -> (task, index). Placeholders have an
/// empty index component.
fn name_parts(job_name: &str) -> (String, String) {
    let mut items: Vec<&str> = job_name.split(SEPARATOR).collect();
    let suffix = items.pop().unwrap_or("").to_string();
    let task = items.pop().unwrap_or("").to_string();
    (task, suffix)
}

/// Materialize the container-job resource for one command of a task.
pub fn new_job(name: &str, command: &str, execution: &Execution, task: &Task) -> ClusterJob {
    let mut labels = std::collections::BTreeMap::new();
    labels.insert(
        LABEL_CONTROLLER_UID.to_string(),
        execution.metadata.uid.clone(),
    );

    // task-level scheduling hints win over execution-wide ones
    let node_selector = if task.node_selector.is_empty() {
        execution.spec.node_selector.clone()
    } else {
        task.node_selector.clone()
    };
    let affinity = task
        .affinity
        .clone()
        .or_else(|| execution.spec.affinity.clone());
    let tolerations = if task.tolerations.is_empty() {
        execution.spec.tolerations.clone()
    } else {
        task.tolerations.clone()
    };

    ClusterJob {
        name: name.to_string(),
        namespace: execution.metadata.namespace.clone(),
        owner_key: execution.key(),
        owner_uid: execution.metadata.uid.clone(),
        labels,
        command: command.to_string(),
        image: task.image.clone(),
        volumes: task.volumes.clone(),
        resources: task.resources.clone(),
        active_deadline_seconds: task.active_deadline_seconds,
        backoff_limit: task.backoff_limit,
        node_selector,
        affinity,
        tolerations,
        conditions: Vec::new(),
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
