// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic read-modify-write updates of Execution status and spec.
//!
//! A JSON merge patch is computed from the modified-vs-original pair and
//! re-applied to the freshly read server copy on every attempt, so
//! concurrent writers to other fields are not clobbered.

use genedag_cluster::{ClusterAdapter, ClusterError};
use genedag_core::Execution;
use serde_json::Value;
use std::sync::Arc;

/// Number of attempts when updating execution status.
const STATUS_UPDATE_RETRIES: usize = 3;

/// Number of attempts when updating execution spec.
const SPEC_UPDATE_RETRIES: usize = 3;

/// Compute an RFC 7386 merge patch turning `original` into `modified`.
pub fn create_merge_patch(original: &Value, modified: &Value) -> Value {
    match (original, modified) {
        (Value::Object(original), Value::Object(modified)) => {
            let mut patch = serde_json::Map::new();
            for (key, modified_value) in modified {
                match original.get(key) {
                    Some(original_value) if original_value == modified_value => {}
                    Some(original_value) => {
                        patch.insert(
                            key.clone(),
                            create_merge_patch(original_value, modified_value),
                        );
                    }
                    None => {
                        patch.insert(key.clone(), modified_value.clone());
                    }
                }
            }
            for key in original.keys() {
                if !modified.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            Value::Object(patch)
        }
        _ => modified.clone(),
    }
}

async fn update_with_patch<C: ClusterAdapter>(
    cluster: &Arc<C>,
    modified: &Execution,
    patch: &Value,
    retries: usize,
) -> Result<(), ClusterError> {
    let namespace = modified.metadata.namespace.clone();
    let name = modified.metadata.name.clone();

    let mut last_err = ClusterError::Transient("no update attempt made".to_string());
    for attempt in 0..retries {
        let current = cluster.get_execution(&namespace, &name).await?;
        let mut value = serde_json::to_value(&current)
            .map_err(|err| ClusterError::Transient(err.to_string()))?;
        json_patch::merge(&mut value, patch);
        let updated: Execution = serde_json::from_value(value)
            .map_err(|err| ClusterError::Transient(err.to_string()))?;

        match cluster.put_execution(&updated).await {
            Ok(_) => return Ok(()),
            Err(err) if err.is_conflict() => {
                tracing::debug!(
                    execution = %modified.key(),
                    attempt,
                    "update conflicted, retrying against fresh copy"
                );
                last_err = err;
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err)
}

fn field_patch(
    original: &Execution,
    modified: &Execution,
    field: &str,
) -> Result<Value, ClusterError> {
    let original = serde_json::to_value(original)
        .map_err(|err| ClusterError::Transient(err.to_string()))?;
    let modified = serde_json::to_value(modified)
        .map_err(|err| ClusterError::Transient(err.to_string()))?;
    let empty = Value::Object(serde_json::Map::new());
    let patch = create_merge_patch(
        original.get(field).unwrap_or(&empty),
        modified.get(field).unwrap_or(&empty),
    );
    Ok(serde_json::json!({ field: patch }))
}

/// Updates only `.status` of an Execution.
pub struct ExecutionStatusUpdater<C> {
    cluster: Arc<C>,
}

impl<C: ClusterAdapter> ExecutionStatusUpdater<C> {
    pub fn new(cluster: Arc<C>) -> Self {
        ExecutionStatusUpdater { cluster }
    }

    pub async fn update_status(
        &self,
        modified: &Execution,
        original: &Execution,
    ) -> Result<(), ClusterError> {
        let patch = field_patch(original, modified, "status")?;
        update_with_patch(&self.cluster, modified, &patch, STATUS_UPDATE_RETRIES).await
    }
}

/// Updates only `.spec` of an Execution; used when a dynamic task's
/// command set is materialized.
pub struct ExecutionSpecUpdater<C> {
    cluster: Arc<C>,
}

impl<C: ClusterAdapter> ExecutionSpecUpdater<C> {
    pub fn new(cluster: Arc<C>) -> Self {
        ExecutionSpecUpdater { cluster }
    }

    pub async fn update_spec(
        &self,
        modified: &Execution,
        original: &Execution,
    ) -> Result<(), ClusterError> {
        let patch = field_patch(original, modified, "spec")?;
        update_with_patch(&self.cluster, modified, &patch, SPEC_UPDATE_RETRIES).await
    }
}

#[cfg(test)]
#[path = "updater_tests.rs"]
mod tests;
