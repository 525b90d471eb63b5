// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph arena tests: edges, roots, dynamic expansion, cycle detection.

use super::*;
use genedag_cluster::ClusterJob;
use genedag_core::TaskType;

fn job(name: &str) -> ClusterJob {
    ClusterJob {
        name: name.into(),
        namespace: "gene".into(),
        ..ClusterJob::default()
    }
}

fn vertex(name: &str, dynamic: bool) -> Vertex {
    Vertex::new(
        JobInfo {
            job: job(name),
            finished: false,
            task_type: TaskType::Job,
            dynamic_task: None,
        },
        dynamic,
    )
}

fn chain() -> Graph {
    // a -> b -> c
    let mut graph = Graph::new(vec![
        vertex("wf.a.0", false),
        vertex("wf.b.0", false),
        vertex("wf.c.0", false),
    ]);
    graph.add_edge(0, 1);
    graph.add_edge(1, 2);
    graph
}

#[test]
fn roots_have_no_dependents() {
    let graph = chain();
    assert_eq!(graph.roots(), vec![0]);
}

#[test]
fn dependents_are_reverse_edges() {
    let graph = chain();
    assert_eq!(graph.dependents_of(2), vec![1]);
    assert!(graph.dependents_of(0).is_empty());
}

#[test]
fn duplicate_and_self_edges_are_ignored() {
    let mut graph = Graph::new(vec![vertex("wf.a.0", false), vertex("wf.b.0", false)]);
    graph.add_edge(0, 1);
    graph.add_edge(0, 1);
    graph.add_edge(0, 0);
    assert_eq!(graph.vertex(0).unwrap().children(), &[1]);
}

#[test]
fn find_by_job_name_is_exact_for_static_vertices() {
    let graph = chain();
    assert_eq!(graph.find_by_job_name("wf.b.0"), Some(1));
    assert_eq!(graph.find_by_job_name("wf.b.1"), None);
}

#[test]
fn dynamic_placeholder_matches_by_prefix() {
    let graph = Graph::new(vec![vertex("wf.child.", true)]);
    assert_eq!(graph.find_by_job_name("wf.child.2"), Some(0));
    assert_eq!(graph.find_by_job_name("wf.other.0"), None);
}

#[test]
fn success_counter_tracks_expected_total() {
    let mut graph = chain();
    assert_eq!(graph.expected_total(), 3);
    graph.add_success();
    graph.add_success();
    assert!(!graph.all_succeeded());
    let (successes, total) = graph.add_success();
    assert_eq!((successes, total), (3, 3));
    assert!(graph.all_succeeded());
}

#[test]
fn expand_placeholder_reuses_slot_and_appends() {
    // parent -> placeholder -> sink
    let mut graph = Graph::new(vec![
        vertex("wf.parent.0", false),
        vertex("wf.child.", true),
        vertex("wf.sink.0", false),
    ]);
    graph.add_edge(0, 1);
    graph.add_edge(1, 2);

    let indices = graph.expand_placeholder(
        1,
        vec![job("wf.child.0"), job("wf.child.1"), job("wf.child.2")],
    );
    assert_eq!(indices, vec![1, 3, 4]);
    assert_eq!(graph.expected_total(), 5);

    // the slot vertex is concrete now
    let slot = graph.vertex(1).unwrap();
    assert!(!slot.is_dynamic());
    assert_eq!(slot.job_name(), "wf.child.0");

    // every replacement inherits the outgoing edge to the sink
    for index in [1, 3, 4] {
        assert_eq!(graph.vertex(index).unwrap().children(), &[2]);
    }
    // the sink now depends on all three
    assert_eq!(graph.dependents_of(2), vec![1, 3, 4]);
}

#[test]
fn expanding_a_static_vertex_is_a_no_op() {
    let mut graph = chain();
    assert!(graph.expand_placeholder(0, vec![job("x")]).is_empty());
    assert_eq!(graph.expected_total(), 3);
}

#[test]
fn acyclic_graph_has_no_cycle() {
    assert!(chain().is_dag());
}

#[test]
fn cycle_is_found_with_path() {
    let mut graph = Graph::new(vec![
        vertex("wf.a.0", false),
        vertex("wf.b.0", false),
        vertex("wf.c.0", false),
    ]);
    graph.add_edge(0, 1);
    graph.add_edge(1, 2);
    graph.add_edge(2, 0);
    let cycle = graph.find_cycle().expect("cycle");
    assert_eq!(cycle.len(), 4);
    assert_eq!(cycle.first(), cycle.last());
}
