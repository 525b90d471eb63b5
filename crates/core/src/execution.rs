// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster-side Execution resource and its embedded types.

use crate::condition::{Condition, GenericCondition, VarsIterEntry};
use crate::quantity::Quantity;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// API group/version of the Execution resource.
pub const GROUP_VERSION: &str = "gene/v1alpha1";

/// Resource kind of the Execution resource.
pub const KIND_EXECUTION: &str = "Execution";

/// Phase of a vertex (and, by reuse, of a whole execution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexPhase {
    Running,
    Succeeded,
    Failed,
    Error,
}

impl VertexPhase {
    /// Terminal phases never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VertexPhase::Succeeded | VertexPhase::Failed | VertexPhase::Error
        )
    }
}

impl fmt::Display for VertexPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexPhase::Running => write!(f, "Running"),
            VertexPhase::Succeeded => write!(f, "Succeeded"),
            VertexPhase::Failed => write!(f, "Failed"),
            VertexPhase::Error => write!(f, "Error"),
        }
    }
}

/// Type of a task in an execution spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    Job,
    Spark,
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Job
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Job => write!(f, "Job"),
            TaskType::Spark => write!(f, "Spark"),
        }
    }
}

/// Type of a vertex in the status tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VertexType {
    Job,
    Spark,
}

impl Default for VertexType {
    fn default() -> Self {
        VertexType::Job
    }
}

/// Dependency semantics between two tasks.
///
/// `Whole`: every container job of the successor waits for all container
/// jobs of the predecessor. `Iterate`: container jobs are paired by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependType {
    Whole,
    Iterate,
}

impl Default for DependType {
    fn default() -> Self {
        DependType::Whole
    }
}

impl fmt::Display for DependType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependType::Whole => write!(f, "whole"),
            DependType::Iterate => write!(f, "iterate"),
        }
    }
}

/// A single dependency edge of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependent {
    pub target: String,
    #[serde(default, rename = "type")]
    pub depend_type: DependType,
}

/// Volume binding mounted into every container job of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub mount_path: String,
    pub mount_from: VolumeSource,
}

/// Backing storage of a volume. Only persistent volume claims are supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSource {
    pub pvc: String,
}

/// Compute resources requested for every container job of a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub cpu: Quantity,
    #[serde(default)]
    pub memory: Quantity,
}

/// Templated command set kept on a task whose expansion is deferred until
/// an upstream job completes (`get_result`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandsIter {
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars_iter: Vec<VarsIterEntry>,
}

impl CommandsIter {
    /// True when any axis is still waiting on upstream output.
    pub fn is_deferred(&self) -> bool {
        self.vars_iter
            .iter()
            .any(|entry| matches!(entry, VarsIterEntry::GetResult { .. }))
    }
}

/// A unit of execution. One task becomes 1..N container jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    #[serde(default, rename = "type")]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_set: Vec<String>,
    /// Unexpanded command template, present only for dynamic tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands_iter: Option<CommandsIter>,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, Volume>,
    #[serde(default)]
    pub resources: ResourceRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<Dependent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_condition: Option<GenericCondition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<serde_json::Value>,
}

impl Task {
    /// True when this task's command set is materialized only after an
    /// upstream job completes.
    pub fn is_dynamic(&self) -> bool {
        self.commands_iter
            .as_ref()
            .map(CommandsIter::is_deferred)
            .unwrap_or(false)
    }
}

/// Desired state of an execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSpec {
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<serde_json::Value>,
    /// Max container jobs of this execution running at the same time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<i64>,
}

/// Status of one vertex in the DAG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexStatus {
    /// Unique identifier of the vertex, derived from its name.
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub vertex_type: VertexType,
    pub phase: VertexPhase,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

/// Observed state of an execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<VertexPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub vertices: IndexMap<String, VertexStatus>,
}

/// Identifying metadata of a namespaced resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default)]
    pub resource_version: u64,
}

/// The cluster-side representation of a submitted workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ExecutionSpec,
    #[serde(default)]
    pub status: ExecutionStatus,
}

impl Execution {
    /// Cache key of this execution: `namespace/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }

    /// Look up a task by name.
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.spec.tasks.iter().find(|t| t.name == name)
    }
}

/// Split a `namespace/name` key into its parts.
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    let mut parts = key.splitn(2, '/');
    match (parts.next(), parts.next()) {
        (Some(ns), Some(name)) if !ns.is_empty() && !name.is_empty() => Some((ns, name)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
