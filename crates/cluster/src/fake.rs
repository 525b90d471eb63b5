// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory cluster used by the dev daemon and tests.

use crate::adapter::{ClusterAdapter, ClusterError, WatchEvent};
use crate::job::{ClusterJob, JobCondition, JobConditionKind};
use async_trait::async_trait;
use genedag_core::Execution;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::broadcast;

/// Output capture bound, matching the pod-log read limit.
const OUTPUT_LIMIT: usize = 1024;

#[derive(Default)]
struct State {
    executions: HashMap<String, Execution>,
    jobs: HashMap<String, ClusterJob>,
    /// Scripted stdout per job name, served by `job_output`.
    outputs: HashMap<String, String>,
    /// Every create attempt, including rejected duplicates.
    create_attempts: Vec<String>,
    next_uid: u64,
}

/// An in-memory [`ClusterAdapter`].
///
/// Jobs never run anything; tests and the dev daemon drive them to a
/// terminal state with [`FakeCluster::finish_job`] and pre-script their
/// stdout with [`FakeCluster::script_output`].
pub struct FakeCluster {
    state: Mutex<State>,
    watch_tx: broadcast::Sender<WatchEvent>,
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCluster {
    pub fn new() -> Self {
        let (watch_tx, _) = broadcast::channel(256);
        FakeCluster {
            state: Mutex::new(State::default()),
            watch_tx,
        }
    }

    /// Script the stdout served for a job name (keyed within a namespace).
    pub fn script_output(&self, namespace: &str, job_name: &str, output: &str) {
        let mut state = self.state.lock();
        state
            .outputs
            .insert(format!("{namespace}/{job_name}"), output.to_string());
    }

    /// Drive a job to a terminal condition and notify watchers.
    pub fn finish_job(&self, namespace: &str, name: &str, success: bool, message: &str) -> bool {
        let key = format!("{namespace}/{name}");
        let finished = {
            let mut state = self.state.lock();
            match state.jobs.get_mut(&key) {
                Some(job) if !job.is_finished() => {
                    job.conditions.push(JobCondition {
                        kind: if success {
                            JobConditionKind::Complete
                        } else {
                            JobConditionKind::Failed
                        },
                        message: message.to_string(),
                    });
                    true
                }
                _ => false,
            }
        };
        if finished {
            self.notify(WatchEvent::JobChanged { key });
        }
        finished
    }

    /// Names of jobs whose creation was requested, in order, duplicates
    /// included.
    pub fn create_attempts(&self) -> Vec<String> {
        self.state.lock().create_attempts.clone()
    }

    /// Currently stored jobs that have not reached a terminal condition.
    pub fn running_jobs(&self, namespace: &str) -> Vec<ClusterJob> {
        self.state
            .lock()
            .jobs
            .values()
            .filter(|job| job.namespace == namespace && !job.is_finished())
            .cloned()
            .collect()
    }

    fn notify(&self, event: WatchEvent) {
        // no receivers is fine; watchers re-read state on subscribe
        let _ = self.watch_tx.send(event);
    }
}

#[async_trait]
impl ClusterAdapter for FakeCluster {
    async fn create_job(&self, job: &ClusterJob) -> Result<(), ClusterError> {
        let key = job.key();
        {
            let mut state = self.state.lock();
            state.create_attempts.push(job.name.clone());
            if state.jobs.contains_key(&key) {
                return Err(ClusterError::AlreadyExists(key));
            }
            state.jobs.insert(key.clone(), job.clone());
        }
        tracing::debug!(job = %key, "job created");
        self.notify(WatchEvent::JobChanged { key });
        Ok(())
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<ClusterJob, ClusterError> {
        let key = format!("{namespace}/{name}");
        self.state
            .lock()
            .jobs
            .get(&key)
            .cloned()
            .ok_or(ClusterError::NotFound(key))
    }

    async fn list_jobs(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterJob>, ClusterError> {
        Ok(self
            .state
            .lock()
            .jobs
            .values()
            .filter(|job| job.namespace == namespace && job.matches_labels(selector))
            .cloned()
            .collect())
    }

    async fn job_output(&self, namespace: &str, name: &str) -> Result<String, ClusterError> {
        let key = format!("{namespace}/{name}");
        let state = self.state.lock();
        if !state.jobs.contains_key(&key) {
            return Err(ClusterError::NotFound(key));
        }
        let raw = state.outputs.get(&key).cloned().unwrap_or_default();
        let mut output: String = raw.chars().take(OUTPUT_LIMIT).collect();
        if output.ends_with('\n') {
            output.pop();
        }
        Ok(output)
    }

    async fn submit_execution(&self, exec: &Execution) -> Result<Execution, ClusterError> {
        let key = exec.key();
        let stored = {
            let mut state = self.state.lock();
            if state.executions.contains_key(&key) {
                return Err(ClusterError::AlreadyExists(key));
            }
            state.next_uid += 1;
            let mut stored = exec.clone();
            stored.metadata.uid = format!("uid-{}", state.next_uid);
            stored.metadata.resource_version = 1;
            state.executions.insert(key.clone(), stored.clone());
            stored
        };
        tracing::debug!(execution = %key, "execution submitted");
        self.notify(WatchEvent::ExecutionChanged { key });
        Ok(stored)
    }

    async fn get_execution(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Execution, ClusterError> {
        let key = format!("{namespace}/{name}");
        self.state
            .lock()
            .executions
            .get(&key)
            .cloned()
            .ok_or(ClusterError::NotFound(key))
    }

    async fn put_execution(&self, exec: &Execution) -> Result<Execution, ClusterError> {
        let key = exec.key();
        let stored = {
            let mut state = self.state.lock();
            let current = state
                .executions
                .get(&key)
                .ok_or_else(|| ClusterError::NotFound(key.clone()))?;
            if current.metadata.resource_version != exec.metadata.resource_version {
                return Err(ClusterError::Conflict(key));
            }
            let mut stored = exec.clone();
            stored.metadata.resource_version += 1;
            state.executions.insert(key.clone(), stored.clone());
            stored
        };
        self.notify(WatchEvent::ExecutionChanged { key });
        Ok(stored)
    }

    async fn delete_execution(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let key = format!("{namespace}/{name}");
        let owned: Vec<String> = {
            let mut state = self.state.lock();
            if state.executions.remove(&key).is_none() {
                return Err(ClusterError::NotFound(key));
            }
            // garbage-collect owned jobs, as owner references would
            let owned = state
                .jobs
                .values()
                .filter(|job| job.owner_key == key)
                .map(ClusterJob::key)
                .collect::<Vec<_>>();
            for job_key in &owned {
                state.jobs.remove(job_key);
            }
            owned
        };
        self.notify(WatchEvent::ExecutionChanged { key });
        for job_key in owned {
            self.notify(WatchEvent::JobChanged { key: job_key });
        }
        Ok(())
    }

    async fn list_executions(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<Execution>, ClusterError> {
        let state = self.state.lock();
        let mut executions: Vec<Execution> = state
            .executions
            .values()
            .filter(|exec| namespace.is_none_or(|ns| exec.metadata.namespace == ns))
            .cloned()
            .collect();
        executions.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(executions)
    }

    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.watch_tx.subscribe()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
