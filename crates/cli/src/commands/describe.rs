// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `genectl describe execution` - show one execution in detail.

use crate::client::DaemonClient;
use crate::output::{format_table, format_time};
use crate::Cli;
use anyhow::Result;
use clap::{Args, Subcommand};
use genedag_core::Execution;

#[derive(Args)]
pub struct DescribeArgs {
    #[command(subcommand)]
    resource: DescribeResource,
}

#[derive(Subcommand)]
enum DescribeResource {
    /// Describe an execution
    Execution { name: String },
}

pub async fn run(cli: &Cli, args: &DescribeArgs) -> Result<()> {
    let DescribeResource::Execution { name } = &args.resource;
    let client = DaemonClient::new(&cli.socket);
    let execution = client.get_execution(&cli.namespace, name).await?;
    print!("{}", render(&execution));
    Ok(())
}

fn render(execution: &Execution) -> String {
    let mut out = String::new();
    out.push_str(&format!("Name:         {}\n", execution.metadata.name));
    out.push_str(&format!("Namespace:    {}\n", execution.metadata.namespace));
    out.push_str(&format!(
        "Phase:        {}\n",
        execution
            .status
            .phase
            .map(|phase| phase.to_string())
            .unwrap_or_else(|| "Pending".to_string())
    ));
    out.push_str(&format!(
        "Started:      {}\n",
        format_time(execution.status.started_at)
    ));
    out.push_str(&format!(
        "Finished:     {}\n",
        format_time(execution.status.finished_at)
    ));
    if !execution.status.message.is_empty() {
        out.push_str(&format!("Message:      {}\n", execution.status.message));
    }
    if let Some(parallelism) = execution.spec.parallelism {
        out.push_str(&format!("Parallelism:  {parallelism}\n"));
    }

    out.push_str("\nTasks:\n");
    let task_rows: Vec<Vec<String>> = execution
        .spec
        .tasks
        .iter()
        .map(|task| {
            vec![
                task.name.clone(),
                task.task_type.to_string(),
                task.image.clone(),
                task.command_set.len().to_string(),
                task.dependents
                    .iter()
                    .map(|dependent| {
                        format!("{}({})", dependent.target, dependent.depend_type)
                    })
                    .collect::<Vec<_>>()
                    .join(","),
            ]
        })
        .collect();
    out.push_str(&indent(&format_table(
        &["NAME", "TYPE", "IMAGE", "COMMANDS", "DEPENDS"],
        &task_rows,
    )));

    if !execution.status.vertices.is_empty() {
        out.push_str("\nVertices:\n");
        let vertex_rows: Vec<Vec<String>> = execution
            .status
            .vertices
            .values()
            .map(|vertex| {
                vec![
                    vertex.name.clone(),
                    vertex.phase.to_string(),
                    format_time(vertex.started_at),
                    format_time(vertex.finished_at),
                    vertex.message.clone(),
                ]
            })
            .collect();
        out.push_str(&indent(&format_table(
            &["NAME", "PHASE", "STARTED", "FINISHED", "MESSAGE"],
            &vertex_rows,
        )));
    }
    out
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("  {line}\n")
            }
        })
        .collect()
}
