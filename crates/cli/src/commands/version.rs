// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `genectl version`.

use crate::client::DaemonClient;
use crate::Cli;
use anyhow::Result;

pub async fn run(cli: &Cli) -> Result<()> {
    println!("genectl {}", env!("CARGO_PKG_VERSION"));
    match DaemonClient::new(&cli.socket).version().await {
        Ok(version) => println!("genedagd {version}"),
        Err(_) => println!("genedagd unreachable"),
    }
    Ok(())
}
