// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Authoring-form workflows: parsing, validation, instantiation and
//! translation into the cluster-side Execution resource.

mod instantiate;
mod model;
mod parser;
mod tools;
mod translate;
mod validate;

pub use instantiate::{
    instantiate_workflow, merge_inputs, InstantiateError, InstantiatedJob, InstantiatedWorkflow,
};
pub use model::{
    CommandsIter, Depend, Input, JobInfo, OutputDesc, PathsIter, Resources, Tool, Volume,
    VolumeSource, Workflow, ARRAY_TYPE, BOOL_TYPE, INPUT_TYPES, NUMBER_TYPE, STRING_TYPE,
};
pub use parser::{parse_workflow, set_workflow_defaults, ParseError};
pub use tools::{fetch_tools, parse_tools, tools_to_map, ToolError};
pub use translate::{execution_name, execution_namespace, to_execution, TranslateError};
pub use validate::{validate_workflow, ValidationError};
