// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation tests: every check of the aggregate validator.

use super::*;
use crate::model::{CommandsIter, Depend, Input, JobInfo, Resources, Workflow};
use crate::parser::{parse_workflow, set_workflow_defaults};
use genedag_core::{GenericCondition, MatchOperator, MatchRule};
use serde_json::json;
use yare::parameterized;

fn workflow_from(yaml: &str) -> Workflow {
    let mut workflow = parse_workflow(yaml).unwrap();
    set_workflow_defaults(&mut workflow);
    workflow
}

fn minimal_job(commands: &[&str]) -> JobInfo {
    JobInfo {
        tool: "t:1".into(),
        commands: commands.iter().map(|c| c.to_string()).collect(),
        ..JobInfo::default()
    }
}

fn assert_has_error(errors: &[ValidationError], needle: &str) {
    assert!(
        errors.iter().any(|e| e.to_string().contains(needle)),
        "expected an error containing {needle:?}, got {errors:?}"
    );
}

#[test]
fn valid_workflow_has_no_errors() {
    let workflow = workflow_from(
        r#"
inputs:
  sample:
    default: s1
  npart:
    default: 4
    type: number
  samples:
    default: [a, b]
    type: array
volumes:
  data:
    mount_path: /data
    mount_from:
      pvc: pvc-gene
workflow:
  job-a:
    tool: t:1
    resources:
      cpu: 2c
      memory: 4g
    commands:
      - echo ${sample}
  job-b:
    tool: t:1
    commands_iter:
      command: run ${1} ${2} ${item}
      vars_iter:
        - ${samples}
        - range(0, ${npart})
    depends:
      - target: job-a
"#,
    );
    assert_eq!(validate_workflow(&workflow), Vec::new());
}

#[test]
fn empty_workflow_is_rejected() {
    let errors = validate_workflow(&Workflow::default());
    assert_has_error(&errors, "no job defined");
}

#[parameterized(
    bad_type = { "inputs:\n  x:\n    type: float\nworkflow:\n  job-a:\n    tool: t:1\n    commands: [echo]\n", "invalid type" },
    default_mismatch = { "inputs:\n  x:\n    type: number\n    default: not-a-number\nworkflow:\n  job-a:\n    tool: t:1\n    commands: [echo]\n", "default value" },
)]
fn input_findings(yaml: &str, needle: &str) {
    let errors = validate_workflow(&workflow_from(yaml));
    assert_has_error(&errors, needle);
}

#[parameterized(
    uppercase = { "Job-A" },
    leading_dash = { "-job" },
    trailing_dash = { "job-" },
    underscore = { "job_a" },
)]
fn bad_job_names_are_rejected(name: &str) {
    let mut workflow = Workflow::default();
    workflow.jobs.insert(name.to_string(), minimal_job(&["echo"]));
    let errors = validate_workflow(&workflow);
    assert_has_error(&errors, "job name");
}

#[test]
fn over_long_job_name_is_rejected() {
    let mut workflow = Workflow::default();
    let name = format!("job-{}", "a".repeat(40));
    workflow.jobs.insert(name, minimal_job(&["echo"]));
    assert_has_error(&validate_workflow(&workflow), "more than 40 characters");
}

#[parameterized(
    cpu_unit = { "8G", "", 1 },
    memory_unit = { "", "8C", 1 },
    both = { "8Cc", "8Gg", 2 },
    cpu_variant = { "${cpu}c", "", 1 },
)]
fn resource_format_findings(cpu: &str, memory: &str, count: usize) {
    let mut workflow = Workflow::default();
    let mut job = minimal_job(&["echo"]);
    job.resources = Resources {
        cpu: cpu.into(),
        memory: memory.into(),
    };
    workflow.jobs.insert("job-a".into(), job);
    let errors = validate_workflow(&workflow);
    let resource_errors: Vec<_> = errors
        .iter()
        .filter(|e| e.location.contains("resources"))
        .collect();
    assert_eq!(resource_errors.len(), count, "errors: {errors:?}");
}

#[parameterized(
    valid_cpu_lower = { "8c", "" },
    valid_cpu_fraction = { "18.5c", "" },
    valid_plain = { "18.5", "8" },
    valid_memory = { "", "8g" },
)]
fn resource_formats_accepted(cpu: &str, memory: &str) {
    let mut workflow = Workflow::default();
    let mut job = minimal_job(&["echo"]);
    job.resources = Resources {
        cpu: cpu.into(),
        memory: memory.into(),
    };
    workflow.jobs.insert("job-a".into(), job);
    let errors = validate_workflow(&workflow);
    assert!(
        errors.iter().all(|e| !e.location.contains("resources")),
        "errors: {errors:?}"
    );
}

#[test]
fn tool_must_be_present_and_literal() {
    let mut workflow = Workflow::default();
    workflow.jobs.insert("job-a".into(), JobInfo {
        tool: String::new(),
        commands: vec!["echo".into()],
        ..JobInfo::default()
    });
    workflow.jobs.insert("job-b".into(), JobInfo {
        tool: "${tool}".into(),
        commands: vec!["echo".into()],
        ..JobInfo::default()
    });
    let errors = validate_workflow(&workflow);
    assert_has_error(&errors, "workflow.job-a.tool");
    assert_has_error(&errors, "workflow.job-b.tool");
}

#[test]
fn undeclared_variant_in_command_is_reported() {
    let workflow = workflow_from(
        "workflow:\n  job-a:\n    tool: t:1\n    commands:\n      - echo ${lost-input}\n",
    );
    assert_has_error(&validate_workflow(&workflow), "variant [lost-input] undefined");
}

#[test]
fn item_and_positional_indices_are_accepted() {
    let workflow = workflow_from(
        r#"
workflow:
  job-a:
    tool: t:1
    commands_iter:
      command: run ${1} ${item}
      vars_iter:
        - [a, b]
"#,
    );
    assert_eq!(validate_workflow(&workflow), Vec::new());
}

#[test]
fn positional_index_beyond_axes_is_reported() {
    let workflow = workflow_from(
        r#"
workflow:
  job-a:
    tool: t:1
    commands_iter:
      command: run ${1} ${2}
      vars_iter:
        - [a, b]
"#,
    );
    assert_has_error(&validate_workflow(&workflow), "${2} is larger");
}

#[test]
fn vars_only_commands_iter_is_valid() {
    let workflow = workflow_from(
        r#"
workflow:
  job-a:
    tool: t:1
    commands_iter:
      command: run ${1} ${2}
      vars:
        - [a, b]
        - [c, d]
"#,
    );
    assert_eq!(validate_workflow(&workflow), Vec::new());
}

#[parameterized(
    command_missing = { "workflow:\n  job-a:\n    tool: t:1\n    commands_iter:\n      vars:\n        - [a]\n", "command is empty" },
    rows_missing = { "workflow:\n  job-a:\n    tool: t:1\n    commands_iter:\n      command: run ${1}\n", "vars and vars_iter are empty" },
)]
fn half_declared_commands_iter_is_reported(yaml: &str, needle: &str) {
    assert_has_error(&validate_workflow(&workflow_from(yaml)), needle);
}

#[test]
fn nested_array_in_vars_row_is_reported() {
    let mut workflow = Workflow::default();
    let mut job = minimal_job(&[]);
    job.commands_iter = CommandsIter {
        command: "run ${1}".into(),
        vars: vec![json!([["a", "b"]])],
        vars_iter: Vec::new(),
    };
    workflow.jobs.insert("job-a".into(), job);
    assert_has_error(&validate_workflow(&workflow), "should not be array");
}

#[test]
fn variant_axis_must_be_array_typed() {
    let workflow = workflow_from(
        r#"
inputs:
  sample:
    default: s1
workflow:
  job-a:
    tool: t:1
    commands_iter:
      command: run ${1}
      vars_iter:
        - ${sample}
"#,
    );
    assert_has_error(&validate_workflow(&workflow), "can only be one of");
}

#[parameterized(
    bad_shape = { "range(1; 4)" },
    bad_param = { "range(1, lots)" },
)]
fn bad_range_calls_are_reported(call: &str) {
    let mut workflow = Workflow::default();
    let mut job = minimal_job(&[]);
    job.commands_iter = CommandsIter {
        command: "run ${1}".into(),
        vars: Vec::new(),
        vars_iter: vec![json!(call)],
    };
    workflow.jobs.insert("job-a".into(), job);
    assert!(!validate_workflow(&workflow).is_empty());
}

#[test]
fn depend_findings() {
    let workflow = workflow_from(
        r#"
workflow:
  job-a:
    tool: t:1
    commands: [echo]
    depends:
      - target: job-missing
        type: sideways
"#,
    );
    let errors = validate_workflow(&workflow);
    assert_has_error(&errors, "should only be iterate or whole");
    assert_has_error(&errors, "[job-missing] does not exist");
}

#[test]
fn cycle_is_reported_with_path() {
    let workflow = workflow_from(
        r#"
workflow:
  job-a:
    tool: t:1
    commands: [echo]
    depends:
      - target: job-c
  job-b:
    tool: t:1
    commands: [echo]
    depends:
      - target: job-a
  job-c:
    tool: t:1
    commands: [echo]
    depends:
      - target: job-b
"#,
    );
    let errors = validate_workflow(&workflow);
    let cycle = errors
        .iter()
        .find(|e| e.message.contains("cycle"))
        .expect("cycle error");
    // any rotation of a->c->b->a is acceptable
    assert!(cycle.message.contains("->"), "message: {}", cycle.message);
    assert!(
        ["job-a", "job-b", "job-c"]
            .iter()
            .all(|n| cycle.message.contains(n)),
        "message: {}",
        cycle.message
    );
}

#[test]
fn self_dependency_is_a_cycle() {
    let workflow = workflow_from(
        "workflow:\n  job-a:\n    tool: t:1\n    commands: [echo]\n    depends:\n      - target: job-a\n",
    );
    assert_has_error(&validate_workflow(&workflow), "cycle");
}

#[parameterized(
    pvc_missing = { "volumes:\n  v:\n    mount_path: /data\n    mount_from:\n      pvc: \"\"\nworkflow:\n  job-a:\n    tool: t:1\n    commands: [echo]\n", "must not be empty" },
    relative_path = { "volumes:\n  v:\n    mount_path: data\n    mount_from:\n      pvc: pvc-1\nworkflow:\n  job-a:\n    tool: t:1\n    commands: [echo]\n", "absolute path" },
)]
fn volume_findings(yaml: &str, needle: &str) {
    assert_has_error(&validate_workflow(&workflow_from(yaml)), needle);
}

#[test]
fn condition_check_result_requires_single_whole_dependency() {
    let workflow = workflow_from(
        r#"
workflow:
  job-probe:
    tool: t:1
    commands: [echo 1]
  job-other:
    tool: t:1
    commands: [echo x]
  job-gated:
    tool: t:1
    commands: [echo gated]
    condition: check_result(job-probe, "1")
    depends:
      - target: job-probe
      - target: job-other
"#,
    );
    assert_has_error(&validate_workflow(&workflow), "single dependency");
}

#[test]
fn condition_check_result_rejects_iterate_dependency() {
    let workflow = workflow_from(
        r#"
workflow:
  job-probe:
    tool: t:1
    commands: [echo 1]
  job-gated:
    tool: t:1
    commands: [echo gated]
    condition: check_result(job-probe, "1")
    depends:
      - target: job-probe
        type: iterate
"#,
    );
    assert_has_error(&validate_workflow(&workflow), "whole dependency");
}

#[test]
fn condition_producer_must_have_single_command() {
    let workflow = workflow_from(
        r#"
workflow:
  job-probe:
    tool: t:1
    commands: [echo 1, echo 2]
  job-gated:
    tool: t:1
    commands: [echo gated]
    condition: check_result(job-probe, "1")
    depends:
      - target: job-probe
"#,
    );
    assert_has_error(&validate_workflow(&workflow), "more than one command");
}

#[test]
fn well_shaped_check_result_passes() {
    let workflow = workflow_from(
        r#"
workflow:
  job-probe:
    tool: t:1
    commands: [echo 1]
  job-gated:
    tool: t:1
    commands: [echo gated]
    condition: check_result(job-probe, "1")
    depends:
      - target: job-probe
"#,
    );
    assert_eq!(validate_workflow(&workflow), Vec::new());
}

#[test]
fn get_result_axis_is_shape_checked() {
    let workflow = workflow_from(
        r#"
workflow:
  job-parent:
    tool: t:1
    commands: [echo a,b,c]
  job-child:
    tool: t:1
    commands_iter:
      command: sh ${1}.sh
      vars_iter:
        - get_result(job-parent, ",")
    depends:
      - target: job-parent
"#,
    );
    assert_eq!(validate_workflow(&workflow), Vec::new());
}

#[test]
fn get_result_on_missing_job_is_reported() {
    let workflow = workflow_from(
        r#"
workflow:
  job-child:
    tool: t:1
    commands_iter:
      command: sh ${1}.sh
      vars_iter:
        - get_result(job-ghost, ",")
"#,
    );
    assert_has_error(&validate_workflow(&workflow), "[job-ghost] does not exist");
}

fn generic_condition_workflow(rule: MatchRule) -> Workflow {
    let mut workflow = Workflow::default();
    workflow
        .jobs
        .insert("job-probe".into(), minimal_job(&["echo result:pass"]));
    let mut gated = minimal_job(&["echo gated"]);
    gated.depends = vec![Depend {
        target: "job-probe".into(),
        depend_type: "whole".into(),
    }];
    gated.generic_condition = Some(GenericCondition {
        depend_job_name: "job-probe".into(),
        match_rules: vec![rule],
    });
    workflow.jobs.insert("job-gated".into(), gated);
    workflow
}

#[parameterized(
    in_needs_values = { MatchOperator::In, &[], "must not be empty" },
    exists_refuses_values = { MatchOperator::Exists, &["x"], "must be empty" },
    gt_single_value = { MatchOperator::Gt, &["1", "2"], "single value" },
)]
fn generic_condition_arity(operator: MatchOperator, values: &[&str], needle: &str) {
    let workflow = generic_condition_workflow(MatchRule {
        key: "result".into(),
        operator,
        values: values.iter().map(|v| v.to_string()).collect(),
    });
    assert_has_error(&validate_workflow(&workflow), needle);
}

#[test]
fn generic_condition_key_must_be_literal() {
    let workflow = generic_condition_workflow(MatchRule {
        key: "${key}".into(),
        operator: MatchOperator::Exists,
        values: Vec::new(),
    });
    assert_has_error(&validate_workflow(&workflow), "must not be empty or a variant");
}

#[test]
fn well_shaped_generic_condition_passes() {
    let workflow = generic_condition_workflow(MatchRule {
        key: "result".into(),
        operator: MatchOperator::In,
        values: vec!["pass".into()],
    });
    assert_eq!(validate_workflow(&workflow), Vec::new());
}

#[test]
fn outputs_paths_iter_is_validated() {
    let workflow = workflow_from(
        r#"
workflow:
  job-a:
    tool: t:1
    commands: [echo]
outputs:
  bad:
    paths_iter:
      path: out/${1}
      vars: []
"#,
    );
    assert_has_error(
        &validate_workflow(&workflow),
        "vars and vars_iter are empty",
    );
}

#[test]
fn multiple_findings_are_aggregated() {
    let workflow = workflow_from(
        r#"
inputs:
  x:
    type: float
workflow:
  Job-Bad:
    tool: ""
    commands:
      - echo ${missing}
"#,
    );
    let errors = validate_workflow(&workflow);
    assert!(errors.len() >= 3, "expected several findings, got {errors:?}");
}

#[test]
fn input_declared_as_value_is_accepted() {
    let mut workflow = Workflow::default();
    workflow.inputs.insert(
        "sample".into(),
        Input {
            value: Some(json!("s1")),
            input_type: "string".into(),
            ..Input::default()
        },
    );
    workflow
        .jobs
        .insert("job-a".into(), minimal_job(&["echo ${sample}"]));
    assert_eq!(validate_workflow(&workflow), Vec::new());
}
