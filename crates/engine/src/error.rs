// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine.

use genedag_cluster::ClusterError;
use thiserror::Error;

/// Errors from controller sync handlers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error("invalid execution: {0}")]
    Validation(String),
    #[error("invalid key {0:?}: either namespace or name is missing")]
    InvalidKey(String),
}

/// Errors from the job-event scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Running jobs have reached the execution parallelism limit; the
    /// event is deferred, not failed.
    #[error("running jobs have reached the execution parallelism limit")]
    ExceedParallelism,
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error("create job {job} error: {source}")]
    CreateJob {
        job: String,
        source: ClusterError,
    },
}
