//! End-to-end scenarios: dependency ordering, expansion, branch pruning,
//! cycle rejection and the parallelism ceiling.

use crate::prelude::{compile_workflow, Driver};
use genedag_cluster::ClusterAdapter;
use genedag_core::VertexPhase;
use std::collections::HashMap;

#[tokio::test]
async fn whole_dependency_chain_orders_creation() {
    // a -> b, a -> c, b -> d
    let execution = compile_workflow(
        r#"
workflow:
  a:
    tool: sh:1
    commands: ["echo A >> /data/out"]
  b:
    tool: sh:1
    commands: ["echo B >> /data/out"]
    depends: [{target: a, type: whole}]
  c:
    tool: sh:1
    commands: ["echo C >> /data/out"]
    depends: [{target: a, type: whole}]
  d:
    tool: sh:1
    commands: ["echo D >> /data/out"]
    depends: [{target: b, type: whole}]
"#,
        HashMap::new(),
        "wf",
    );
    let driver = Driver::submit(execution).await;
    driver.run_to_quiescence().await;

    let stored = driver.stored_execution().await;
    assert_eq!(stored.status.phase, Some(VertexPhase::Succeeded));

    let a = driver.created_at("wf.a.0");
    let b = driver.created_at("wf.b.0");
    let c = driver.created_at("wf.c.0");
    let d = driver.created_at("wf.d.0");
    assert!(a < b && a < c, "a must run before b and c");
    assert!(b < d, "d waits for b");
}

#[tokio::test]
async fn iterate_dependency_pairs_jobs_by_index() {
    // a (1 cmd) -> b (2 cmds, whole) -> c (2 cmds, iterate on b)
    let execution = compile_workflow(
        r#"
workflow:
  a:
    tool: sh:1
    commands: ["echo A"]
  b:
    tool: sh:1
    commands: ["echo B1", "echo B2"]
    depends: [{target: a, type: whole}]
  c:
    tool: sh:1
    commands: ["echo C1", "echo C2"]
    depends: [{target: b, type: iterate}]
"#,
        HashMap::new(),
        "wf",
    );
    let driver = Driver::submit(execution).await;
    driver.run_to_quiescence().await;

    let stored = driver.stored_execution().await;
    assert_eq!(stored.status.phase, Some(VertexPhase::Succeeded));

    let a = driver.created_at("wf.a.0");
    let b1 = driver.created_at("wf.b.0");
    let b2 = driver.created_at("wf.b.1");
    let c1 = driver.created_at("wf.c.0");
    let c2 = driver.created_at("wf.c.1");
    assert!(a < b1 && a < b2, "a runs first");
    assert!(b1 < c1, "c1 waits for its b counterpart");
    assert!(b2 < c2, "c2 waits for its b counterpart");
}

#[test]
fn range_expansion_produces_three_commands() {
    let execution = compile_workflow(
        r#"
workflow:
  runner:
    tool: sh:1
    commands_iter:
      command: run ${1}
      vars_iter:
        - range(1, 4)
"#,
        HashMap::new(),
        "wf",
    );
    assert_eq!(
        execution.spec.tasks[0].command_set,
        vec!["run 1", "run 2", "run 3"]
    );
}

#[tokio::test]
async fn get_result_expands_into_one_job_per_fragment() {
    let execution = compile_workflow(
        r#"
workflow:
  parent:
    tool: sh:1
    commands: ["echo a,b,c"]
  child:
    tool: sh:1
    commands_iter:
      command: sh ${1}.sh
      vars_iter:
        - get_result(parent, ",")
    depends: [{target: parent, type: whole}]
"#,
        HashMap::new(),
        "wf",
    );
    let driver = Driver::submit(execution).await;
    driver.cluster.script_output("gene", "wf.parent.0", "a,b,c\n");
    driver.run_to_quiescence().await;

    let stored = driver.stored_execution().await;
    assert_eq!(stored.status.phase, Some(VertexPhase::Succeeded));

    let mut commands = Vec::new();
    for name in driver
        .cluster
        .create_attempts()
        .iter()
        .filter(|name| name.starts_with("wf.child."))
    {
        commands.push(driver.cluster.get_job("gene", name).await.expect("job").command);
    }
    assert_eq!(commands, vec!["sh a.sh", "sh b.sh", "sh c.sh"]);

    // the expansion is reflected in the persisted spec
    assert_eq!(
        stored.task("child").unwrap().command_set,
        vec!["sh a.sh", "sh b.sh", "sh c.sh"]
    );
    assert!(stored.task("child").unwrap().commands_iter.is_none());
}

#[tokio::test]
async fn check_result_match_creates_the_gated_job() {
    let execution = gated_execution();
    let driver = Driver::submit(execution).await;
    driver.cluster.script_output("gene", "wf.parent.0", "1\n");
    driver.run_to_quiescence().await;

    let stored = driver.stored_execution().await;
    assert_eq!(stored.status.phase, Some(VertexPhase::Succeeded));
    assert!(driver
        .cluster
        .create_attempts()
        .contains(&"wf.child.0".to_string()));
}

#[tokio::test]
async fn check_result_mismatch_skips_child_but_successors_proceed() {
    let execution = gated_execution();
    let driver = Driver::submit(execution).await;
    driver.cluster.script_output("gene", "wf.parent.0", "0\n");
    driver.run_to_quiescence().await;

    let stored = driver.stored_execution().await;
    assert_eq!(stored.status.phase, Some(VertexPhase::Succeeded));

    let attempts = driver.cluster.create_attempts();
    assert!(
        !attempts.contains(&"wf.child.0".to_string()),
        "gated job must not be created"
    );
    assert!(
        attempts.contains(&"wf.after.0".to_string()),
        "successor of the skipped child still runs"
    );
    // the skipped vertex is recorded as succeeded with a message
    let vertex = &stored.status.vertices["wf.child.0"];
    assert_eq!(vertex.phase, VertexPhase::Succeeded);
    assert!(vertex.message.contains("condition"));
}

fn gated_execution() -> genedag_core::Execution {
    compile_workflow(
        r#"
workflow:
  parent:
    tool: sh:1
    commands: ["echo 1"]
  child:
    tool: sh:1
    commands: ["echo gated"]
    condition: check_result(parent, "1")
    depends: [{target: parent, type: whole}]
  after:
    tool: sh:1
    commands: ["echo after"]
    depends: [{target: child, type: whole}]
"#,
        HashMap::new(),
        "wf",
    )
}

#[test]
fn dependency_cycle_is_rejected_with_its_path() {
    let yaml = r#"
workflow:
  a:
    tool: sh:1
    commands: ["echo a"]
    depends: [{target: c, type: whole}]
  b:
    tool: sh:1
    commands: ["echo b"]
    depends: [{target: a, type: whole}]
  c:
    tool: sh:1
    commands: ["echo c"]
    depends: [{target: b, type: whole}]
"#;
    let mut workflow = genedag_workflow::parse_workflow(yaml).unwrap();
    genedag_workflow::set_workflow_defaults(&mut workflow);
    let errors = genedag_workflow::validate_workflow(&workflow);
    let cycle = errors
        .iter()
        .find(|error| error.message.contains("cycle"))
        .expect("cycle error");
    for name in ["a", "b", "c"] {
        assert!(cycle.message.contains(name), "cycle names {name}: {cycle}");
    }
}

#[tokio::test]
async fn failed_job_fails_the_execution_and_stops_scheduling() {
    let execution = compile_workflow(
        r#"
workflow:
  a:
    tool: sh:1
    commands: ["exit 1"]
  b:
    tool: sh:1
    commands: ["echo b"]
    depends: [{target: a, type: whole}]
"#,
        HashMap::new(),
        "wf",
    );
    let driver = Driver::submit(execution).await;
    driver
        .controller
        .sync_execution(&driver.key)
        .await
        .unwrap();
    driver.drain_events().await;

    driver.cluster.finish_job("gene", "wf.a.0", false, "boom");
    driver.controller.sync_job("gene/wf.a.0").await.unwrap();

    let stored = driver.stored_execution().await;
    assert_eq!(stored.status.phase, Some(VertexPhase::Failed));
    assert!(!driver
        .cluster
        .create_attempts()
        .contains(&"wf.b.0".to_string()));
}

#[tokio::test]
async fn parallelism_ceiling_holds_at_every_instant() {
    let mut execution = compile_workflow(
        r#"
workflow:
  fan:
    tool: sh:1
    commands_iter:
      command: run ${1}
      vars_iter:
        - range(0, 6)
"#,
        HashMap::new(),
        "wf",
    );
    execution.spec.parallelism = Some(2);

    let driver = Driver::submit(execution).await;
    driver
        .controller
        .sync_execution(&driver.key)
        .await
        .unwrap();

    let queue = driver.controller.scheduler().event_queue();
    let mut deferrals = 0;
    loop {
        while !queue.is_empty() {
            let event = queue.get().await.unwrap();
            match driver.controller.scheduler().handle_event(&event).await {
                Ok(()) => queue.forget(&event),
                Err(genedag_engine::SchedulerError::ExceedParallelism) => {
                    deferrals += 1;
                    // re-queue immediately instead of after the fixed delay
                    queue.done(&event);
                    queue.add(event.clone());
                    assert!(driver.cluster.running_jobs("gene").len() <= 2);
                    // make room before retrying
                    driver.finish_next_job(true).await;
                    continue;
                }
                Err(err) => panic!("unexpected scheduler error: {err}"),
            }
            queue.done(&event);
            assert!(
                driver.cluster.running_jobs("gene").len() <= 2,
                "parallelism ceiling violated"
            );
        }
        if !driver.finish_next_job(true).await {
            break;
        }
    }

    assert!(deferrals > 0, "the budget was never exercised");
    let stored = driver.stored_execution().await;
    assert_eq!(stored.status.phase, Some(VertexPhase::Succeeded));
    assert_eq!(driver.cluster.create_attempts().len(), 6);
}
