// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared data model and expression primitives for genedag.

mod condition;
mod event;
mod execution;
mod expr;
mod quantity;
mod status;

pub use condition::{
    parse_result_map, Condition, GenericCondition, MatchOperator, MatchRule, VarsIterEntry,
};
pub use event::{Event, EventKind};
pub use execution::{
    split_key, CommandsIter, DependType, Dependent, Execution, ExecutionSpec, ExecutionStatus,
    ObjectMeta, ResourceRequirements, Task, TaskType, VertexPhase, VertexStatus, VertexType,
    Volume, VolumeSource, GROUP_VERSION, KIND_EXECUTION,
};
pub use expr::{
    cartesian_product, decode_escapes, expand_range, is_check_result_call, is_get_result_call,
    is_range_call, is_variant, parse_check_result_call, parse_get_result_call, parse_range_call,
    render_commands, replace_variant, split_output, to_display_string, variant_name, ExprError,
    RangeCall, VAR_PATTERN,
};
pub use quantity::{Quantity, QuantityError};
pub use status::{
    get_vertex_status, init_vertex_status, is_execution_completed, mark_execution_error,
    mark_execution_failed, mark_execution_phase, mark_execution_running, mark_execution_success,
    mark_vertex_failed, mark_vertex_phase, mark_vertex_success, vertex_id,
};
