//! Shared helpers for the spec suite.

use genedag_cluster::{ClusterAdapter, FakeCluster};
use genedag_core::Execution;
use genedag_engine::ExecutionController;
use std::collections::HashMap;
use std::sync::Arc;

/// Parse, validate, instantiate and translate an authoring document.
pub fn compile_workflow(
    yaml: &str,
    inputs: HashMap<String, serde_json::Value>,
    name: &str,
) -> Execution {
    let mut workflow = genedag_workflow::parse_workflow(yaml).expect("parse");
    genedag_workflow::set_workflow_defaults(&mut workflow);
    let errors = genedag_workflow::validate_workflow(&workflow);
    assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");

    let tools = test_tools();
    let instantiated =
        genedag_workflow::instantiate_workflow(&workflow, &inputs, &tools).expect("instantiate");
    genedag_workflow::to_execution(&instantiated, "gene", name).expect("translate")
}

/// The tool catalogue every spec workflow resolves against.
pub fn test_tools() -> HashMap<String, genedag_workflow::Tool> {
    let catalogue = "\
name: sh\nversion: '1'\nimage: busybox:1.36\n---\n\
name: bwa\nversion: '0.7.12'\nimage: registry/bwa:0.7.12\ncommand: bwa --help\n";
    genedag_workflow::tools_to_map(genedag_workflow::parse_tools(catalogue).expect("tools"))
}

pub struct Driver {
    pub cluster: Arc<FakeCluster>,
    pub controller: Arc<ExecutionController<FakeCluster>>,
    pub key: String,
}

impl Driver {
    /// Submit an execution and build its controller.
    pub async fn submit(execution: Execution) -> Driver {
        let cluster = Arc::new(FakeCluster::new());
        let stored = cluster.submit_execution(&execution).await.expect("submit");
        let controller = ExecutionController::new(Arc::clone(&cluster));
        Driver {
            key: stored.key(),
            cluster,
            controller,
        }
    }

    /// Drive the execution until it stops progressing: events are handled
    /// as they appear, and running jobs finish successfully one at a time
    /// in name order.
    pub async fn run_to_quiescence(&self) {
        self.controller
            .sync_execution(&self.key)
            .await
            .expect("sync execution");
        loop {
            if self.drain_events().await {
                continue;
            }
            if self.finish_next_job(true).await {
                continue;
            }
            break;
        }
    }

    /// Handle every queued scheduler event. Returns true if any ran.
    pub async fn drain_events(&self) -> bool {
        let queue = self.controller.scheduler().event_queue();
        let mut progressed = false;
        while !queue.is_empty() {
            let event = queue.get().await.expect("event");
            self.controller
                .scheduler()
                .handle_event(&event)
                .await
                .expect("handle event");
            queue.forget(&event);
            queue.done(&event);
            progressed = true;
        }
        progressed
    }

    /// Finish the lexicographically first running job and sync it.
    pub async fn finish_next_job(&self, success: bool) -> bool {
        let mut running = self.cluster.running_jobs("gene");
        running.sort_by(|a, b| a.name.cmp(&b.name));
        let Some(job) = running.first() else {
            return false;
        };
        self.cluster.finish_job(&job.namespace, &job.name, success, "");
        self.controller
            .sync_job(&format!("{}/{}", job.namespace, job.name))
            .await
            .expect("sync job");
        true
    }

    pub async fn stored_execution(&self) -> Execution {
        let (namespace, name) = self.key.split_once('/').expect("key");
        self.cluster
            .get_execution(namespace, name)
            .await
            .expect("stored execution")
    }

    /// Index of a job name in the creation log.
    pub fn created_at(&self, job_name: &str) -> usize {
        self.cluster
            .create_attempts()
            .iter()
            .position(|name| name == job_name)
            .unwrap_or_else(|| panic!("job {job_name} was never created"))
    }
}
