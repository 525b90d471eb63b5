// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the genedagd control socket.

use anyhow::{anyhow, Context, Result};
use genedag_core::Execution;
use genedag_daemon::protocol::{self, Request, Response};
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;

pub struct DaemonClient {
    socket: PathBuf,
}

impl DaemonClient {
    pub fn new(socket: &Path) -> Self {
        DaemonClient {
            socket: socket.to_path_buf(),
        }
    }

    async fn round_trip(&self, request: &Request) -> Result<Response> {
        let stream = UnixStream::connect(&self.socket).await.with_context(|| {
            format!(
                "cannot connect to {} (is genedagd running?)",
                self.socket.display()
            )
        })?;
        let (mut reader, mut writer) = stream.into_split();
        protocol::write_request(&mut writer, request).await?;
        let response = protocol::read_response(&mut reader).await?;
        if let Response::Error { message } = response {
            return Err(anyhow!(message));
        }
        Ok(response)
    }

    pub async fn submit_execution(&self, execution: Execution) -> Result<String> {
        match self
            .round_trip(&Request::SubmitExecution {
                execution: Box::new(execution),
            })
            .await?
        {
            Response::Submitted { key } => Ok(key),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn list_executions(&self, namespace: Option<&str>) -> Result<Vec<Execution>> {
        match self
            .round_trip(&Request::ListExecutions {
                namespace: namespace.map(str::to_string),
            })
            .await?
        {
            Response::Executions { items } => Ok(items),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_execution(&self, namespace: &str, name: &str) -> Result<Execution> {
        match self
            .round_trip(&Request::GetExecution {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
            .await?
        {
            Response::Execution { execution } => Ok(*execution),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn delete_execution(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .round_trip(&Request::DeleteExecution {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
            .await?
        {
            Response::Deleted => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn version(&self) -> Result<String> {
        match self.round_trip(&Request::Version).await? {
            Response::Version { version } => Ok(version),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> anyhow::Error {
    anyhow!("unexpected daemon response: {response:?}")
}
