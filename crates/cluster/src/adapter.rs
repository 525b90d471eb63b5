// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter trait for cluster operations.

use crate::job::ClusterJob;
use async_trait::async_trait;
use genedag_core::Execution;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors from cluster operations.
///
/// `Conflict` and `Transient` are retryable; `NotFound`/`AlreadyExists`
/// are usually tolerated by idempotent handlers.
#[derive(Debug, Clone, Error)]
pub enum ClusterError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("transient cluster error: {0}")]
    Transient(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict(_))
    }
}

/// A change observed on the cluster, carrying the resource's cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An execution was added, updated or deleted.
    ExecutionChanged { key: String },
    /// A container job owned by an execution was added, updated or deleted.
    JobChanged { key: String },
}

/// Operations the workflow engine needs from the container cluster.
#[async_trait]
pub trait ClusterAdapter: Send + Sync {
    /// Create a container job. Implementations must return
    /// `AlreadyExists` rather than overwrite.
    async fn create_job(&self, job: &ClusterJob) -> Result<(), ClusterError>;

    async fn get_job(&self, namespace: &str, name: &str) -> Result<ClusterJob, ClusterError>;

    /// List jobs in a namespace matching all selector labels.
    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterJob>, ClusterError>;

    /// Captured standard output of the job's single pod, read to EOF up to
    /// 1 KiB, with one trailing newline trimmed.
    async fn job_output(&self, namespace: &str, name: &str) -> Result<String, ClusterError>;

    /// Submit a new execution. The stored copy (with uid and resource
    /// version assigned) is returned.
    async fn submit_execution(&self, exec: &Execution) -> Result<Execution, ClusterError>;

    async fn get_execution(&self, namespace: &str, name: &str)
        -> Result<Execution, ClusterError>;

    /// Replace an execution. Fails with `Conflict` when the stored
    /// resource version differs from the one carried by `exec`.
    async fn put_execution(&self, exec: &Execution) -> Result<Execution, ClusterError>;

    async fn delete_execution(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    /// List executions, in one namespace or across all.
    async fn list_executions(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<Execution>, ClusterError>;

    /// Subscribe to change notifications. Slow receivers may miss events;
    /// handlers must re-read state on every notification.
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent>;
}
