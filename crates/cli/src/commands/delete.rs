// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `genectl delete execution` - delete an execution.

use crate::client::DaemonClient;
use crate::Cli;
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct DeleteArgs {
    #[command(subcommand)]
    resource: DeleteResource,
}

#[derive(Subcommand)]
enum DeleteResource {
    /// Delete an execution
    Execution { name: String },
}

pub async fn run(cli: &Cli, args: &DeleteArgs) -> Result<()> {
    let DeleteResource::Execution { name } = &args.resource;
    let client = DaemonClient::new(&cli.socket);
    client.delete_execution(&cli.namespace, name).await?;
    println!("execution {}/{name} deleted", cli.namespace);
    Ok(())
}
