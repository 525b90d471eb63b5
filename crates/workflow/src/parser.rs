// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow document loading and defaulting.

use crate::model::{Workflow, STRING_TYPE};
use thiserror::Error;

/// Error loading a workflow document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to unmarshal workflow: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse a workflow document from YAML.
pub fn parse_workflow(data: &str) -> Result<Workflow, ParseError> {
    let workflow = serde_yaml::from_str(data)?;
    Ok(workflow)
}

/// Fill defaults the document may omit: input types default to string.
pub fn set_workflow_defaults(workflow: &mut Workflow) {
    for input in workflow.inputs.values_mut() {
        if input.input_type.is_empty() {
            input.input_type = STRING_TYPE.to_string();
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
