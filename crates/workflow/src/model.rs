// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoring-form workflow document model.

use genedag_core::GenericCondition;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STRING_TYPE: &str = "string";
pub const NUMBER_TYPE: &str = "number";
pub const BOOL_TYPE: &str = "bool";
pub const ARRAY_TYPE: &str = "array";

/// Recognized input parameter types.
pub const INPUT_TYPES: &[&str] = &[STRING_TYPE, NUMBER_TYPE, BOOL_TYPE, ARRAY_TYPE];

/// A tool catalogue entry resolving `name:version` to a container image.
///
/// When a job names a tool and declares no commands at all, the tool's
/// base command is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(alias = "Name")]
    pub name: String,
    pub version: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub tool_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Tool {
    /// Catalogue key of this tool.
    pub fn key(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

/// A typed input parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Value used when none is provided at instantiation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Literal value to use for the parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// One of string, number, bool, array. Defaults to string.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub input_type: String,
}

/// Compute resources in the authoring form; free strings until validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu: String,
}

/// Templated command block: one command per `vars` row plus one per
/// combination of the `vars_iter` axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandsIter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars_iter: Vec<Value>,
}

impl CommandsIter {
    /// True when neither rows nor axes are declared.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.vars_iter.is_empty()
    }
}

fn default_depend_type() -> String {
    "whole".to_string()
}

/// A dependency on another job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depend {
    pub target: String,
    /// One of whole, iterate. Defaults to whole.
    #[serde(default = "default_depend_type", rename = "type")]
    pub depend_type: String,
}

/// A single job declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Tool reference, `name:version`.
    pub tool: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "CommandsIter::is_empty")]
    pub commands_iter: CommandsIter,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<Depend>,
    /// Boolean gate: a literal bool, a `${var}` reference or a
    /// `check_result(job, exp)` call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_condition: Option<GenericCondition>,
}

/// Backing storage of a volume declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeSource {
    pub pvc: String,
}

/// A volume declaration shared by every job of the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub mount_path: String,
    pub mount_from: VolumeSource,
}

/// Templated output path block, shaped like [`CommandsIter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsIter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars_iter: Vec<Value>,
}

impl PathsIter {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.vars_iter.is_empty()
    }
}

/// Declared output artifacts of the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputDesc {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "PathsIter::is_empty")]
    pub paths_iter: PathsIter,
}

/// The workflow document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub inputs: IndexMap<String, Input>,
    /// The job map; serialized under the `workflow` key.
    #[serde(default, rename = "workflow", skip_serializing_if = "IndexMap::is_empty")]
    pub jobs: IndexMap<String, JobInfo>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, Volume>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, OutputDesc>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tools: IndexMap<String, Tool>,
}
