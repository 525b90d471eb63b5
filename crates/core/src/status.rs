// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phase transition helpers for executions and vertices.

use crate::execution::{Execution, VertexPhase, VertexStatus, VertexType};
use chrono::Utc;

/// True when the execution has reached a terminal phase.
pub fn is_execution_completed(exec: &Execution) -> bool {
    exec.status.phase.is_some_and(|phase| phase.is_terminal())
}

pub fn mark_execution_running(exec: &mut Execution, message: &str) {
    mark_execution_phase(exec, VertexPhase::Running, message);
}

pub fn mark_execution_success(exec: &mut Execution, message: &str) {
    mark_execution_phase(exec, VertexPhase::Succeeded, message);
}

pub fn mark_execution_failed(exec: &mut Execution, message: &str) {
    mark_execution_phase(exec, VertexPhase::Failed, message);
}

pub fn mark_execution_error(exec: &mut Execution, message: &str) {
    mark_execution_phase(exec, VertexPhase::Error, message);
}

/// Set the execution phase and message, stamping start/finish times.
///
/// The start time is stamped once, on the first transition; the finish
/// time once, on reaching a terminal phase.
pub fn mark_execution_phase(exec: &mut Execution, phase: VertexPhase, message: &str) {
    if exec.status.phase != Some(phase) {
        tracing::debug!(
            execution = %exec.key(),
            from = ?exec.status.phase,
            to = %phase,
            "execution phase transition"
        );
        exec.status.phase = Some(phase);
    }
    if exec.status.started_at.is_none() {
        exec.status.started_at = Some(Utc::now());
    }
    if exec.status.message != message {
        exec.status.message = message.to_string();
    }
    if phase.is_terminal() && exec.status.finished_at.is_none() {
        exec.status.finished_at = Some(Utc::now());
    }
}

/// Identifier of a vertex within the status map.
///
/// The vertex name is already unique within an execution, so it doubles
/// as the identifier.
pub fn vertex_id(vertex_name: &str) -> String {
    vertex_name.to_string()
}

/// Build the initial status record for a vertex entering `phase`.
pub fn init_vertex_status(
    vertex_name: &str,
    phase: VertexPhase,
    message: &str,
    children: &[String],
) -> VertexStatus {
    VertexStatus {
        id: vertex_id(vertex_name),
        name: vertex_name.to_string(),
        vertex_type: VertexType::Job,
        phase,
        message: message.to_string(),
        started_at: Some(Utc::now()),
        finished_at: None,
        children: children.iter().map(|name| vertex_id(name)).collect(),
    }
}

/// Look up the status entry for a vertex, if one has been recorded.
pub fn get_vertex_status<'a>(exec: &'a Execution, vertex_name: &str) -> Option<&'a VertexStatus> {
    exec.status.vertices.get(&vertex_id(vertex_name))
}

pub fn mark_vertex_success(exec: &mut Execution, vertex_name: &str, message: &str) -> bool {
    mark_vertex_phase(exec, vertex_name, VertexPhase::Succeeded, message)
}

pub fn mark_vertex_failed(exec: &mut Execution, vertex_name: &str, message: &str) -> bool {
    mark_vertex_phase(exec, vertex_name, VertexPhase::Failed, message)
}

/// Advance a vertex to `phase`. Returns false when no status entry exists.
pub fn mark_vertex_phase(
    exec: &mut Execution,
    vertex_name: &str,
    phase: VertexPhase,
    message: &str,
) -> bool {
    let id = vertex_id(vertex_name);
    let Some(status) = exec.status.vertices.get_mut(&id) else {
        return false;
    };
    if status.phase != phase {
        tracing::debug!(vertex = %status.name, from = %status.phase, to = %phase, "vertex phase transition");
        status.phase = phase;
    }
    if status.message != message {
        status.message = message.to_string();
    }
    if phase.is_terminal() && status.finished_at.is_none() {
        status.finished_at = Some(Utc::now());
    }
    true
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
