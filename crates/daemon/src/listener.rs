// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task handling control-socket connections.
//!
//! Runs in a spawned task, accepting connections and serving one request
//! per connection against the cluster adapter, without blocking the
//! controller workers.

use crate::protocol::{self, ProtocolError, Request, Response};
use genedag_cluster::{ClusterAdapter, ClusterError};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, warn};

/// Listener accepting genectl connections on a Unix socket.
pub struct Listener<C> {
    socket: UnixListener,
    cluster: Arc<C>,
}

impl<C: ClusterAdapter + 'static> Listener<C> {
    pub fn new(socket: UnixListener, cluster: Arc<C>) -> Self {
        Listener { socket, cluster }
    }

    /// Accept loop; runs until the task is aborted at shutdown.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let cluster = Arc::clone(&self.cluster);
                    tokio::spawn(async move {
                        match handle_connection(stream, cluster).await {
                            Ok(()) => {}
                            Err(ProtocolError::ConnectionClosed) => debug!("client disconnected"),
                            Err(err) => warn!(error = %err, "connection error"),
                        }
                    });
                }
                Err(err) => error!(error = %err, "accept error"),
            }
        }
    }
}

async fn handle_connection<C: ClusterAdapter>(
    stream: UnixStream,
    cluster: Arc<C>,
) -> Result<(), ProtocolError> {
    let (mut reader, mut writer) = stream.into_split();
    let request = protocol::read_request(&mut reader).await?;
    debug!(request = ?request, "received request");
    let response = handle_request(request, cluster.as_ref()).await;
    protocol::write_response(&mut writer, &response).await
}

async fn handle_request<C: ClusterAdapter>(request: Request, cluster: &C) -> Response {
    match request {
        Request::SubmitExecution { execution } => {
            match cluster.submit_execution(&execution).await {
                Ok(stored) => Response::Submitted { key: stored.key() },
                Err(err) => error_response(err),
            }
        }
        Request::ListExecutions { namespace } => {
            match cluster.list_executions(namespace.as_deref()).await {
                Ok(items) => Response::Executions { items },
                Err(err) => error_response(err),
            }
        }
        Request::GetExecution { namespace, name } => {
            match cluster.get_execution(&namespace, &name).await {
                Ok(execution) => Response::Execution {
                    execution: Box::new(execution),
                },
                Err(err) => error_response(err),
            }
        }
        Request::DeleteExecution { namespace, name } => {
            match cluster.delete_execution(&namespace, &name).await {
                Ok(()) => Response::Deleted,
                Err(err) => error_response(err),
            }
        }
        Request::Version => Response::Version {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }
}

fn error_response(err: ClusterError) -> Response {
    Response::Error {
        message: err.to_string(),
    }
}
