// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `genectl get execution` - list executions.

use crate::client::DaemonClient;
use crate::output::{format_table, format_time, OutputFormat};
use crate::Cli;
use anyhow::Result;
use clap::{Args, Subcommand};
use genedag_core::Execution;

#[derive(Args)]
pub struct GetArgs {
    #[command(subcommand)]
    resource: GetResource,
}

#[derive(Subcommand)]
enum GetResource {
    /// List executions, optionally a single one by name
    Execution {
        /// Execution name; all executions when omitted
        name: Option<String>,
    },
}

pub async fn run(cli: &Cli, args: &GetArgs) -> Result<()> {
    let GetResource::Execution { name } = &args.resource;
    let client = DaemonClient::new(&cli.socket);

    let mut executions = if let Some(name) = name {
        vec![client.get_execution(&cli.namespace, name).await?]
    } else if cli.all_namespaces {
        client.list_executions(None).await?
    } else {
        client.list_executions(Some(&cli.namespace)).await?
    };

    if let Some(phases) = &cli.phase {
        let wanted: Vec<String> = phases
            .split(',')
            .map(|phase| phase.trim().to_lowercase())
            .collect();
        executions.retain(|execution| {
            execution
                .status
                .phase
                .map(|phase| wanted.contains(&phase.to_string().to_lowercase()))
                .unwrap_or(false)
        });
    }

    match cli.output {
        Some(OutputFormat::Json) => println!("{}", serde_json::to_string_pretty(&executions)?),
        Some(OutputFormat::Yaml) => print!("{}", serde_yaml::to_string(&executions)?),
        Some(OutputFormat::Wide) => print!("{}", render_table(&executions, true)),
        None => print!("{}", render_table(&executions, false)),
    }
    Ok(())
}

fn render_table(executions: &[Execution], wide: bool) -> String {
    let mut header = vec!["NAMESPACE", "NAME", "PHASE", "STARTED", "FINISHED"];
    if wide {
        header.push("MESSAGE");
    }
    let rows: Vec<Vec<String>> = executions
        .iter()
        .map(|execution| {
            let mut row = vec![
                execution.metadata.namespace.clone(),
                execution.metadata.name.clone(),
                execution
                    .status
                    .phase
                    .map(|phase| phase.to_string())
                    .unwrap_or_else(|| "Pending".to_string()),
                format_time(execution.status.started_at),
                format_time(execution.status.finished_at),
            ];
            if wide {
                row.push(execution.status.message.clone());
            }
            row
        })
        .collect();
    format_table(&header, &rows)
}
