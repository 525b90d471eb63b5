// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between genectl and genedagd.
//!
//! One JSON-encoded request per connection, newline-terminated; one
//! JSON-encoded response back.

use genedag_core::Execution;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Cap on a single protocol frame.
const MAX_FRAME: usize = 8 * 1024 * 1024;

/// Errors from protocol framing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("frame too large")]
    FrameTooLarge,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Client requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    SubmitExecution { execution: Box<Execution> },
    ListExecutions { namespace: Option<String> },
    GetExecution { namespace: String, name: String },
    DeleteExecution { namespace: String, name: String },
    Version,
}

/// Daemon responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Submitted { key: String },
    Executions { items: Vec<Execution> },
    Execution { execution: Box<Execution> },
    Deleted,
    Version { version: String },
    Error { message: String },
}

async fn read_frame<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader).take(MAX_FRAME as u64);
    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if read >= MAX_FRAME {
        return Err(ProtocolError::FrameTooLarge);
    }
    Ok(line)
}

async fn write_frame<W>(writer: &mut W, frame: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_request<R>(reader: &mut R) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let line = read_frame(reader).await?;
    Ok(serde_json::from_str(&line)?)
}

pub async fn write_request<W>(writer: &mut W, request: &Request) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &serde_json::to_string(request)?).await
}

pub async fn read_response<R>(reader: &mut R) -> Result<Response, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let line = read_frame(reader).await?;
    Ok(serde_json::from_str(&line)?)
}

pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, &serde_json::to_string(response)?).await
}
