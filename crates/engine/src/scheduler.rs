// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job-event scheduler: drives the DAG frontier forward in response
//! to NewAdded and JobsAfter events.

use crate::builder::{new_job, GraphRegistry, SEPARATOR};
use crate::error::SchedulerError;
use crate::graph::Graph;
use crate::updater::{ExecutionSpecUpdater, ExecutionStatusUpdater};
use crate::workqueue::WorkQueue;
use genedag_cluster::{ClusterAdapter, ClusterJob};
use genedag_core::{
    cartesian_product, init_vertex_status, mark_execution_success, mark_vertex_success,
    render_commands, split_key, split_output, Condition, Event, EventKind, Execution, Task,
    VarsIterEntry, VertexPhase,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Events are dropped from the queue after this many failed attempts.
const MAX_RETRIES: u32 = 15;

/// Fixed delay before retrying an event deferred by the parallelism limit.
const PARALLELISM_RETRY_DELAY: Duration = Duration::from_secs(10);

pub(crate) const EXECUTION_SUCCESS_MESSAGE: &str = "execution has run successfully";
const VERTEX_SKIPPED_MESSAGE: &str = "condition not satisfied, no jobs spawned";

/// Consumes the event queue and asks the cluster to create container jobs
/// for ready vertices.
pub struct Scheduler<C> {
    cluster: Arc<C>,
    graphs: Arc<GraphRegistry>,
    event_queue: Arc<WorkQueue<Event>>,
    status_updater: ExecutionStatusUpdater<C>,
    spec_updater: ExecutionSpecUpdater<C>,
}

impl<C: ClusterAdapter + 'static> Scheduler<C> {
    pub fn new(cluster: Arc<C>, graphs: Arc<GraphRegistry>) -> Arc<Self> {
        Arc::new(Scheduler {
            status_updater: ExecutionStatusUpdater::new(Arc::clone(&cluster)),
            spec_updater: ExecutionSpecUpdater::new(Arc::clone(&cluster)),
            cluster,
            graphs,
            event_queue: WorkQueue::new(),
        })
    }

    /// The queue this scheduler drains.
    pub fn event_queue(&self) -> &Arc<WorkQueue<Event>> {
        &self.event_queue
    }

    /// Worker loop: process events until the queue shuts down.
    pub async fn run_worker(self: Arc<Self>) {
        while let Some(event) = self.event_queue.get().await {
            match self.handle_event(&event).await {
                Ok(()) => self.event_queue.forget(&event),
                Err(SchedulerError::ExceedParallelism) => {
                    tracing::debug!(%event, "parallelism limit reached, retrying after delay");
                    self.event_queue
                        .add_after(event.clone(), PARALLELISM_RETRY_DELAY);
                }
                Err(err) => {
                    if self.event_queue.num_requeues(&event) < MAX_RETRIES {
                        tracing::warn!(%event, error = %err, "event sync failed, requeueing");
                        self.event_queue.add_rate_limited(event.clone());
                    } else {
                        tracing::warn!(%event, error = %err, "dropping event out of the queue");
                        self.event_queue.forget(&event);
                    }
                }
            }
            self.event_queue.done(&event);
        }
    }

    /// Process one event. Safe to replay: every cluster write tolerates
    /// already-exists and not-found.
    pub async fn handle_event(&self, event: &Event) -> Result<(), SchedulerError> {
        let Some(graph) = self.graphs.get(&event.key) else {
            tracing::debug!(key = %event.key, "graph of execution does not exist");
            return Ok(());
        };
        let Some((namespace, name)) = split_key(&event.key) else {
            return Ok(());
        };

        match &event.kind {
            EventKind::NewAdded => {
                tracing::debug!(key = %event.key, "execution starts running");
                let execution = self.cluster.get_execution(namespace, name).await?;
                let roots: Vec<ClusterJob> = {
                    let graph = graph.read();
                    graph
                        .roots()
                        .into_iter()
                        .filter_map(|index| graph.vertex(index))
                        .filter(|vertex| !vertex.data.finished && !vertex.is_dynamic())
                        .map(|vertex| vertex.data.job.clone())
                        .collect()
                };
                for job in roots {
                    if self.should_start(&execution, &job).await? {
                        self.create_job(&job).await?;
                    } else {
                        return Err(SchedulerError::ExceedParallelism);
                    }
                }
                Ok(())
            }
            EventKind::JobsAfter { job } => {
                self.handle_jobs_after(event, &graph, namespace, name, job)
                    .await
            }
        }
    }

    async fn handle_jobs_after(
        &self,
        event: &Event,
        graph: &Arc<RwLock<Graph>>,
        namespace: &str,
        name: &str,
        finished_job: &str,
    ) -> Result<(), SchedulerError> {
        tracing::debug!(job = finished_job, "job has run successfully");

        let (parent_job, children) = {
            let graph = graph.read();
            let Some(index) = graph.find_by_job_name(finished_job) else {
                tracing::warn!(job = finished_job, "finished job has no vertex in the graph");
                return Ok(());
            };
            let Some(vertex) = graph.vertex(index) else {
                return Ok(());
            };
            (vertex.data.job.clone(), vertex.children().to_vec())
        };

        let execution = self.cluster.get_execution(namespace, name).await?;

        for child_index in children {
            let Some(child) = graph.read().vertex(child_index).cloned() else {
                continue;
            };
            if child.data.finished {
                continue;
            }

            let all_dependents_finished = {
                let graph = graph.read();
                graph.dependents_of(child_index).into_iter().all(|index| {
                    graph
                        .vertex(index)
                        .map(|vertex| vertex.data.finished)
                        .unwrap_or(false)
                })
            };
            if !all_dependents_finished {
                continue;
            }
            tracing::debug!(job = child.job_name(), "all dependents finished, starting");

            let task = execution.task(task_name_of(child.job_name()));

            if let Some(task) = task {
                if !self.conditions_hold(task, &parent_job).await? {
                    self.skip_child(event, graph, child_index, &execution).await?;
                    continue;
                }
            }

            if child.is_dynamic() {
                self.expand_dynamic_child(graph, child_index, &execution, &parent_job)
                    .await?;
                continue;
            }

            if self.should_start(&execution, &child.data.job).await? {
                self.create_job(&child.data.job).await?;
            } else {
                return Err(SchedulerError::ExceedParallelism);
            }
        }
        Ok(())
    }

    /// Evaluate the task's generic condition and scalar condition against
    /// the completed dependent's captured output.
    async fn conditions_hold(
        &self,
        task: &Task,
        parent_job: &ClusterJob,
    ) -> Result<bool, SchedulerError> {
        if let Some(generic) = &task.generic_condition {
            let output = self
                .cluster
                .job_output(&parent_job.namespace, &parent_job.name)
                .await?;
            if !generic.is_satisfied(&output) {
                return Ok(false);
            }
        }
        match &task.condition {
            None => Ok(true),
            Some(Condition::Bool(value)) => Ok(*value),
            Some(Condition::CheckResult { expected, .. }) => {
                let output = self
                    .cluster
                    .job_output(&parent_job.namespace, &parent_job.name)
                    .await?;
                Ok(output == *expected)
            }
        }
    }

    /// A pruned child is marked finished with no jobs spawned, counts
    /// toward completion, and unblocks its successors.
    async fn skip_child(
        &self,
        event: &Event,
        graph_lock: &Arc<RwLock<Graph>>,
        child_index: usize,
        execution: &Execution,
    ) -> Result<(), SchedulerError> {
        let (vertex_name, child_names, successes, total) = {
            let mut graph = graph_lock.write();
            let child_names = child_job_names(&graph, child_index);
            let Some(vertex) = graph.vertex_mut(child_index) else {
                return Ok(());
            };
            if vertex.data.finished {
                return Ok(());
            }
            vertex.data.finished = true;
            let vertex_name = vertex.job_name().to_string();
            let (successes, total) = graph.add_success();
            (vertex_name, child_names, successes, total)
        };
        tracing::debug!(job = %vertex_name, "condition not satisfied, marking finished");

        let mut modified = execution.clone();
        if genedag_core::get_vertex_status(&modified, &vertex_name).is_none() {
            let status = init_vertex_status(
                &vertex_name,
                VertexPhase::Succeeded,
                VERTEX_SKIPPED_MESSAGE,
                &child_names,
            );
            modified.status.vertices.insert(status.id.clone(), status);
        } else {
            mark_vertex_success(&mut modified, &vertex_name, VERTEX_SKIPPED_MESSAGE);
        }
        if successes == total {
            mark_execution_success(&mut modified, EXECUTION_SUCCESS_MESSAGE);
        }
        self.status_updater.update_status(&modified, execution).await?;

        if successes != total {
            self.event_queue.add(Event::jobs_after(&event.key, vertex_name));
        }
        Ok(())
    }

    /// Expand a dynamic placeholder from the dependent's captured output
    /// and create one job per resulting command.
    async fn expand_dynamic_child(
        &self,
        graph_lock: &Arc<RwLock<Graph>>,
        child_index: usize,
        execution: &Execution,
        parent_job: &ClusterJob,
    ) -> Result<(), SchedulerError> {
        let Some(task) = graph_lock
            .read()
            .vertex(child_index)
            .and_then(|vertex| vertex.data.dynamic_task.clone())
        else {
            return Ok(());
        };
        let Some(iter) = task.commands_iter.clone() else {
            return Ok(());
        };

        let output = self
            .cluster
            .job_output(&parent_job.namespace, &parent_job.name)
            .await?;

        let axes: Vec<Vec<serde_json::Value>> = iter
            .vars_iter
            .iter()
            .map(|entry| match entry {
                VarsIterEntry::List(values) => values.clone(),
                VarsIterEntry::GetResult { sep, .. } => split_output(&output, sep),
            })
            .collect();
        let mut rows = iter.vars.clone();
        rows.extend(cartesian_product(&axes));

        let mut commands = task.command_set.clone();
        commands.extend(render_commands(&iter.command, &rows));
        tracing::debug!(task = %task.name, count = commands.len(), "dynamic expansion produced commands");

        // persist the now-concrete command set; scheduling does not depend
        // on it succeeding, the next resync repairs the spec
        let mut modified = execution.clone();
        if let Some(spec_task) = modified
            .spec
            .tasks
            .iter_mut()
            .find(|spec_task| spec_task.name == task.name)
        {
            spec_task.command_set = commands.clone();
            spec_task.commands_iter = None;
        }
        if let Err(err) = self.spec_updater.update_spec(&modified, execution).await {
            tracing::warn!(task = %task.name, error = %err, "persisting expanded command set failed");
        }

        let prefix = format!(
            "{}{SEPARATOR}{}{SEPARATOR}",
            execution.metadata.name, task.name
        );
        let jobs: Vec<ClusterJob> = commands
            .iter()
            .enumerate()
            .map(|(index, command)| new_job(&format!("{prefix}{index}"), command, execution, &task))
            .collect();

        graph_lock
            .write()
            .expand_placeholder(child_index, jobs.clone());

        for job in &jobs {
            self.create_job(job).await?;
        }
        Ok(())
    }

    /// Idempotent job creation: an existing job is success.
    async fn create_job(&self, job: &ClusterJob) -> Result<(), SchedulerError> {
        match self.cluster.get_job(&job.namespace, &job.name).await {
            Ok(_) => return Ok(()),
            Err(err) if err.is_not_found() => {}
            Err(err) => {
                return Err(SchedulerError::CreateJob {
                    job: job.key(),
                    source: err,
                })
            }
        }
        match self.cluster.create_job(job).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_already_exists() => Ok(()),
            Err(err) => Err(SchedulerError::CreateJob {
                job: job.key(),
                source: err,
            }),
        }
    }

    /// Enforce the execution-wide parallelism budget by counting active
    /// jobs under the execution's controller-uid label.
    async fn should_start(
        &self,
        execution: &Execution,
        job: &ClusterJob,
    ) -> Result<bool, SchedulerError> {
        let Some(parallelism) = execution.spec.parallelism else {
            return Ok(true);
        };
        let jobs = self
            .cluster
            .list_jobs(&job.namespace, &job.labels)
            .await?;
        let active = jobs.iter().filter(|job| !job.is_finished()).count();
        Ok((active as i64) < parallelism)
    }
}

fn task_name_of(job_name: &str) -> &str {
    let mut parts = job_name.rsplit(SEPARATOR);
    let _suffix = parts.next();
    parts.next().unwrap_or("")
}

fn child_job_names(graph: &Graph, index: usize) -> Vec<String> {
    graph
        .vertex(index)
        .map(|vertex| {
            vertex
                .children()
                .iter()
                .filter_map(|&child| graph.vertex(child))
                .map(|child| child.job_name().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
