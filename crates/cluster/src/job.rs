// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The container-job resource as genedag sees it.

use genedag_core::{ResourceRequirements, Volume};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carrying the owning execution's UID on every job, so parallelism
/// enforcement survives a controller restart.
pub const LABEL_CONTROLLER_UID: &str = "controller-uid";

/// Terminal condition kind of a container job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobConditionKind {
    Complete,
    Failed,
}

/// A condition reported on a container job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCondition {
    pub kind: JobConditionKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// A container job owned by an execution.
///
/// The command is run as `sh -c <command>` inside the task's image; the
/// adapter is responsible for the rest of the pod shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterJob {
    pub name: String,
    pub namespace: String,
    /// Execution key (`namespace/name`) this job belongs to.
    pub owner_key: String,
    /// UID of the owning execution.
    pub owner_uid: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub command: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, Volume>,
    #[serde(default)]
    pub resources: ResourceRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<JobCondition>,
}

impl ClusterJob {
    /// The job's terminal condition, if it has reached one.
    pub fn terminal_condition(&self) -> Option<&JobCondition> {
        self.conditions
            .iter()
            .find(|c| matches!(c.kind, JobConditionKind::Complete | JobConditionKind::Failed))
    }

    /// True when the job has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.terminal_condition().is_some()
    }

    /// True when every selector label is present with the same value.
    pub fn matches_labels(&self, selector: &BTreeMap<String, String>) -> bool {
        selector
            .iter()
            .all(|(k, v)| self.labels.get(k).is_some_and(|have| have == v))
    }

    /// Cache key of this job: `namespace/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}
