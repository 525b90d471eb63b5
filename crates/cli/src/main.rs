// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! genectl - command-line front-end for genedag

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "genectl",
    version,
    about = "genectl - submit and inspect gene-sequencing workflow executions"
)]
pub struct Cli {
    /// Control socket of the genedag daemon
    #[arg(long, global = true, default_value = "/tmp/genedagd.sock")]
    socket: PathBuf,

    /// Tool repository: a directory or an http(s) URL
    #[arg(long, global = true, default_value = "/genedag/tools")]
    tool_repo: String,

    /// Namespace to operate in
    #[arg(short = 'n', long, global = true, default_value = "default")]
    namespace: String,

    /// Operate across all namespaces
    #[arg(long, global = true)]
    all_namespaces: bool,

    /// Output format
    #[arg(short = 'o', long, global = true, value_enum)]
    output: Option<OutputFormat>,

    /// Validate and print the execution instead of submitting it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Comma-separated list of phases to filter on
    #[arg(long, global = true)]
    phase: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit workflows and jobs
    Sub(commands::sub::SubArgs),
    /// List executions
    Get(commands::get::GetArgs),
    /// Show the details of one execution
    Describe(commands::describe::DescribeArgs),
    /// Delete an execution
    Delete(commands::delete::DeleteArgs),
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Sub(args) => commands::sub::run(&cli, args).await,
        Commands::Get(args) => commands::get::run(&cli, args).await,
        Commands::Describe(args) => commands::describe::run(&cli, args).await,
        Commands::Delete(args) => commands::delete::run(&cli, args).await,
        Commands::Version => commands::version::run(&cli).await,
    }
}
