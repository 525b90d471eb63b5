// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! genedag daemon (genedagd)
//!
//! Hosts the execution controller: watches executions and container jobs,
//! drives their DAGs, and serves the genectl control socket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use clap::Parser;
use genedag_cluster::{ClusterAdapter, FakeCluster};
use genedag_daemon::listener::Listener;
use genedag_engine::ExecutionController;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UnixListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often the dev completer sweeps for jobs to finish.
const DEV_COMPLETE_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(
    name = "genedagd",
    version,
    about = "genedag controller daemon - drives workflow executions on a container cluster"
)]
struct Args {
    /// Path of the control socket genectl connects to
    #[arg(long, default_value = "/tmp/genedagd.sock")]
    socket: PathBuf,

    /// Workers per queue class
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Run against the in-memory cluster and auto-complete jobs.
    /// Exercises the control loop, not the containers.
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GENEDAG_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if !args.dev {
        // the in-memory backend is the only one this build ships; a real
        // cluster adapter plugs in behind the same trait
        return Err("only --dev mode is available in this build".into());
    }

    info!(workers = args.workers, "starting genedag controller daemon");

    let cluster = Arc::new(FakeCluster::new());
    let controller = ExecutionController::new(Arc::clone(&cluster));

    let watch = cluster.subscribe();
    let watch_pump = tokio::spawn(Arc::clone(&controller).run_watch(watch));
    let workers = controller.spawn_workers(args.workers);

    let completer = tokio::spawn(dev_completer(Arc::clone(&cluster)));

    if args.socket.exists() {
        std::fs::remove_file(&args.socket)?;
    }
    let socket = UnixListener::bind(&args.socket)?;
    info!(socket = %args.socket.display(), "control socket ready");
    let listener = tokio::spawn(Listener::new(socket, Arc::clone(&cluster)).run());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    controller.shut_down();
    for handle in workers {
        let _ = handle.await;
    }
    listener.abort();
    completer.abort();
    watch_pump.abort();
    let _ = std::fs::remove_file(&args.socket);
    Ok(())
}

/// Drive dev-mode jobs to completion: anything running finishes
/// successfully on the next sweep.
async fn dev_completer(cluster: Arc<FakeCluster>) {
    let mut ticker = tokio::time::interval(DEV_COMPLETE_INTERVAL);
    loop {
        ticker.tick().await;
        for namespace in namespaces(&cluster).await {
            for job in cluster.running_jobs(&namespace) {
                cluster.finish_job(&job.namespace, &job.name, true, "success");
            }
        }
    }
}

async fn namespaces(cluster: &FakeCluster) -> Vec<String> {
    match cluster.list_executions(None).await {
        Ok(executions) => {
            let mut namespaces: Vec<String> = executions
                .into_iter()
                .map(|execution| execution.metadata.namespace)
                .collect();
            namespaces.sort();
            namespaces.dedup();
            namespaces
        }
        Err(_) => Vec::new(),
    }
}
