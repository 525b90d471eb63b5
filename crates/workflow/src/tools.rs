// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool catalogue loading.
//!
//! A tool repository is either a directory walked recursively for `.yaml`
//! files or a single document fetched over HTTP; each file is a
//! multi-document YAML stream of tool entries.

use crate::model::Tool;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the tool catalogue.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("fetch remote tool repo error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("read tool file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse tool: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid tool: {0}")]
    Invalid(String),
}

/// Load tools from a repository reference: an `http(s)://` URL or a
/// directory path.
pub fn fetch_tools(tool_repo: &str) -> Result<HashMap<String, Tool>, ToolError> {
    let tools = if tool_repo.starts_with("http://") || tool_repo.starts_with("https://") {
        let body = reqwest::blocking::get(tool_repo)?.text()?;
        parse_tools(&body)?
    } else {
        let mut tools = Vec::new();
        for path in collect_tool_files(Path::new(tool_repo))? {
            let body = std::fs::read_to_string(&path).map_err(|source| ToolError::Io {
                path: path.clone(),
                source,
            })?;
            tools.extend(parse_tools(&body)?);
        }
        tools
    };
    tracing::debug!(repo = tool_repo, count = tools.len(), "loaded tool catalogue");
    Ok(tools_to_map(tools))
}

/// Parse a multi-document YAML stream of tool entries.
pub fn parse_tools(data: &str) -> Result<Vec<Tool>, ToolError> {
    let mut tools = Vec::new();
    for document in serde_yaml::Deserializer::from_str(data) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        let tool: Tool = serde_yaml::from_value(value)?;
        validate_tool(&tool)?;
        tools.push(tool);
    }
    Ok(tools)
}

/// Key tools by `name:version`.
pub fn tools_to_map(tools: Vec<Tool>) -> HashMap<String, Tool> {
    tools.into_iter().map(|tool| (tool.key(), tool)).collect()
}

fn validate_tool(tool: &Tool) -> Result<(), ToolError> {
    if tool.name.is_empty() {
        return Err(ToolError::Invalid("tool name is required".into()));
    }
    if tool.version.is_empty() {
        return Err(ToolError::Invalid("tool version is required".into()));
    }
    if tool.image.is_empty() {
        return Err(ToolError::Invalid("tool image is required".into()));
    }
    Ok(())
}

fn collect_tool_files(root: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|source| ToolError::Io {
            path: dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| ToolError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "yaml") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
