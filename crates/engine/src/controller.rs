// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution controller: watches executions and container jobs,
//! keeps per-execution DAGs alive, and turns job lifecycle updates into
//! scheduler events and status writes.

use crate::builder::GraphRegistry;
use crate::error::EngineError;
use crate::scheduler::{Scheduler, EXECUTION_SUCCESS_MESSAGE};
use crate::updater::ExecutionStatusUpdater;
use crate::validation::validate_execution;
use crate::workqueue::WorkQueue;
use genedag_cluster::{ClusterAdapter, ClusterJob, JobConditionKind, WatchEvent};
use genedag_core::{
    get_vertex_status, init_vertex_status, is_execution_completed, mark_execution_error,
    mark_execution_failed, mark_execution_running, mark_execution_success, mark_vertex_failed,
    mark_vertex_success, split_key, Event, Execution, VertexPhase,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EXECUTION_RUNNING_MESSAGE: &str = "execution is running";
const MISS_VERTEX_MESSAGE: &str = "execution is running but can not find vertex in the graph";
const MISS_GRAPH_MESSAGE: &str = "graph of execution does not exist";
const VERTEX_RUNNING_MESSAGE: &str = "vertex is running";

/// Watches Execution and container-Job resources and drives per-execution
/// DAGs through the scheduler.
pub struct ExecutionController<C> {
    cluster: Arc<C>,
    graphs: Arc<GraphRegistry>,
    scheduler: Arc<Scheduler<C>>,
    status_updater: ExecutionStatusUpdater<C>,
    exec_queue: Arc<WorkQueue<String>>,
    job_queue: Arc<WorkQueue<String>>,
}

impl<C: ClusterAdapter + 'static> ExecutionController<C> {
    pub fn new(cluster: Arc<C>) -> Arc<Self> {
        let graphs = Arc::new(GraphRegistry::new());
        let scheduler = Scheduler::new(Arc::clone(&cluster), Arc::clone(&graphs));
        Arc::new(ExecutionController {
            status_updater: ExecutionStatusUpdater::new(Arc::clone(&cluster)),
            scheduler,
            graphs,
            cluster,
            exec_queue: WorkQueue::new(),
            job_queue: WorkQueue::new(),
        })
    }

    pub fn graphs(&self) -> &Arc<GraphRegistry> {
        &self.graphs
    }

    pub fn scheduler(&self) -> &Arc<Scheduler<C>> {
        &self.scheduler
    }

    /// Enqueue an execution key for sync.
    pub fn enqueue_execution(&self, key: impl Into<String>) {
        self.exec_queue.add(key.into());
    }

    /// Enqueue a container-job key for sync.
    pub fn enqueue_job(&self, key: impl Into<String>) {
        self.job_queue.add(key.into());
    }

    /// Spawn the worker pools: one pool per queue class plus the
    /// scheduler's event workers.
    pub fn spawn_workers(self: &Arc<Self>, workers: usize) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for _ in 0..workers.max(1) {
            let controller = Arc::clone(self);
            handles.push(tokio::spawn(controller.run_exec_worker()));
            let controller = Arc::clone(self);
            handles.push(tokio::spawn(controller.run_job_worker()));
            let scheduler = Arc::clone(&self.scheduler);
            handles.push(tokio::spawn(scheduler.run_worker()));
        }
        handles
    }

    /// Pump adapter watch notifications into the work queues.
    pub async fn run_watch(self: Arc<Self>, mut events: broadcast::Receiver<WatchEvent>) {
        loop {
            match events.recv().await {
                Ok(WatchEvent::ExecutionChanged { key }) => self.enqueue_execution(key),
                Ok(WatchEvent::JobChanged { key }) => self.enqueue_job(key),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "watch stream lagged, events collapsed");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Stop all queues; workers drain and exit.
    pub fn shut_down(&self) {
        self.exec_queue.shut_down();
        self.job_queue.shut_down();
        self.scheduler.event_queue().shut_down();
    }

    async fn run_exec_worker(self: Arc<Self>) {
        while let Some(key) = self.exec_queue.get().await {
            if let Err(err) = self.sync_execution(&key).await {
                tracing::warn!(key, error = %err, "error syncing execution");
            }
            self.exec_queue.done(&key);
        }
    }

    async fn run_job_worker(self: Arc<Self>) {
        while let Some(key) = self.job_queue.get().await {
            match self.sync_job(&key).await {
                Ok(true) => self.job_queue.forget(&key),
                Ok(false) => self.job_queue.add_rate_limited(key.clone()),
                Err(err) => {
                    tracing::warn!(key, error = %err, "error syncing job");
                    self.job_queue.add_rate_limited(key.clone());
                }
            }
            self.job_queue.done(&key);
        }
    }

    /// Sync one execution: validate, ensure its graph, kick the scheduler.
    pub async fn sync_execution(&self, key: &str) -> Result<(), EngineError> {
        let (namespace, name) =
            split_key(key).ok_or_else(|| EngineError::InvalidKey(key.to_string()))?;

        let execution = match self.cluster.get_execution(namespace, name).await {
            Ok(execution) => execution,
            Err(err) if err.is_not_found() => {
                tracing::debug!(key, "execution has been deleted, dropping graph");
                self.graphs.delete(key);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = validate_execution(&execution) {
            let mut modified = execution.clone();
            mark_execution_error(&mut modified, &err.to_string());
            if let Err(update_err) = self
                .status_updater
                .update_status(&modified, &execution)
                .await
            {
                tracing::warn!(key, error = %update_err, "update execution status failed");
            }
            return Err(err);
        }

        if !self.graphs.contains(key) {
            tracing::debug!(key, "generating graph for execution");
            self.graphs.add(&execution);
        }

        self.scheduler.event_queue().add(Event::new_added(key));
        Ok(())
    }

    /// Sync one container job. Returns true when the key can be forgotten.
    pub async fn sync_job(&self, key: &str) -> Result<bool, EngineError> {
        let (namespace, name) =
            split_key(key).ok_or_else(|| EngineError::InvalidKey(key.to_string()))?;

        let job = match self.cluster.get_job(namespace, name).await {
            Ok(job) => job,
            Err(err) if err.is_not_found() => {
                tracing::debug!(key, "job has been deleted");
                return Ok(true);
            }
            Err(err) => return Err(err.into()),
        };

        // resolve the owning execution; jobs without one are not ours
        let Some((owner_namespace, owner_name)) = split_key(&job.owner_key) else {
            tracing::debug!(key, "job does not belong to an execution");
            return Ok(true);
        };
        let shared = match self.cluster.get_execution(owner_namespace, owner_name).await {
            Ok(execution) => execution,
            Err(err) if err.is_not_found() => return Ok(true),
            Err(err) => return Err(err.into()),
        };
        if shared.metadata.uid != job.owner_uid {
            return Ok(true);
        }
        if is_execution_completed(&shared) {
            return Ok(true);
        }
        let mut execution = shared.clone();

        let Some(graph_lock) = self.graphs.get(&shared.key()) else {
            mark_execution_error(&mut execution, MISS_GRAPH_MESSAGE);
            self.status_updater.update_status(&execution, &shared).await?;
            tracing::warn!(execution = %shared.key(), "graph of execution does not exist");
            return Ok(true);
        };

        let vertex_index = graph_lock.read().find_by_job_name(&job.name);
        let Some(vertex_index) = vertex_index else {
            mark_execution_error(&mut execution, MISS_VERTEX_MESSAGE);
            self.status_updater.update_status(&execution, &shared).await?;
            return Ok(true);
        };

        self.ensure_vertex_running(&mut execution, &graph_lock, vertex_index, &job);

        match job.terminal_condition() {
            Some(condition) if condition.kind == JobConditionKind::Failed => {
                mark_vertex_failed(&mut execution, &job.name, &condition.message);
                mark_execution_failed(&mut execution, &condition.message);
                self.status_updater.update_status(&execution, &shared).await?;
                Ok(true)
            }
            Some(condition) => {
                let already_finished = graph_lock
                    .read()
                    .vertex(vertex_index)
                    .map(|vertex| vertex.data.finished)
                    .unwrap_or(false);
                if already_finished {
                    return Ok(true);
                }

                let (successes, total) = {
                    let mut graph = graph_lock.write();
                    if let Some(vertex) = graph.vertex_mut(vertex_index) {
                        vertex.data.finished = true;
                    }
                    graph.add_success()
                };

                let message = if condition.message.is_empty() {
                    "success"
                } else {
                    &condition.message
                };
                mark_vertex_success(&mut execution, &job.name, message);
                if successes == total {
                    mark_execution_success(&mut execution, EXECUTION_SUCCESS_MESSAGE);
                }
                self.status_updater.update_status(&execution, &shared).await?;

                if successes != total {
                    self.scheduler
                        .event_queue()
                        .add(Event::jobs_after(shared.key(), &job.name));
                }
                Ok(true)
            }
            None => {
                if execution.status.phase.is_none() {
                    mark_execution_running(&mut execution, EXECUTION_RUNNING_MESSAGE);
                }
                self.status_updater.update_status(&execution, &shared).await?;
                Ok(true)
            }
        }
    }

    /// Record a Running vertex status the first time a job is observed.
    fn ensure_vertex_running(
        &self,
        execution: &mut Execution,
        graph_lock: &Arc<parking_lot::RwLock<crate::graph::Graph>>,
        vertex_index: usize,
        job: &ClusterJob,
    ) {
        if get_vertex_status(execution, &job.name).is_some() {
            return;
        }
        let child_names: Vec<String> = {
            let graph = graph_lock.read();
            graph
                .vertex(vertex_index)
                .map(|vertex| {
                    vertex
                        .children()
                        .iter()
                        .filter_map(|&child| graph.vertex(child))
                        .map(|child| child.job_name().to_string())
                        .collect()
                })
                .unwrap_or_default()
        };
        let status = init_vertex_status(
            &job.name,
            VertexPhase::Running,
            VERTEX_RUNNING_MESSAGE,
            &child_names,
        );
        execution.status.vertices.insert(status.id.clone(), status);
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
