// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end runs over in-memory stores: single leaves, wired protocols,
//! interface/outerface plumbing, failure visibility, staleness and the
//! serial queue.

use crate::engine::queue::RunQueue;
use crate::engine::scheduler::Runner;
use crate::errors::{RunError, TaskError};
use crate::graph::port::{PortAddr, PortSpec};
use crate::graph::resource::{Resource, ResourceRef};
use crate::process::process::Process;
use crate::process::protocol::Subgraph;
use crate::process::task::{ProcessTask, TaskContext, TaskOutputs};
use crate::process::testing::{concat_process, emit_process, upper_process, VersionedUpperTask};
use crate::store::{MemoryResourceStore, MemoryStore, Record, ResourceStore, Store};
use crate::tasks::text::ReverseTask;
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct CountingJoinTask {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl ProcessTask for CountingJoinTask {
    fn type_name(&self) -> &str {
        "counting_join"
    }

    fn input_specs(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::typed("left", "text"),
            PortSpec::typed("right", "text"),
        ]
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("result", "text")]
    }

    async fn task(&self, ctx: &TaskContext) -> Result<TaskOutputs, TaskError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let left = ctx.input("left")?.payload();
        let right = ctx.input("right")?.payload();
        let joined = format!(
            "{}{}",
            left.as_str().unwrap_or_default(),
            right.as_str().unwrap_or_default()
        );
        let mut outputs = TaskOutputs::new();
        outputs.set("result", Resource::new("text", json!(joined)));
        Ok(outputs)
    }
}

struct FailingTask;

#[async_trait]
impl ProcessTask for FailingTask {
    fn type_name(&self) -> &str {
        "failing"
    }

    fn input_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("in", "text")]
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("out", "text")]
    }

    async fn task(&self, _ctx: &TaskContext) -> Result<TaskOutputs, TaskError> {
        Err("deliberate failure".into())
    }
}

struct SlowEmitTask {
    delay: Duration,
}

#[async_trait]
impl ProcessTask for SlowEmitTask {
    fn type_name(&self) -> &str {
        "slow_emit"
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("text", "text")]
    }

    async fn task(&self, _ctx: &TaskContext) -> Result<TaskOutputs, TaskError> {
        tokio::time::sleep(self.delay).await;
        let mut outputs = TaskOutputs::new();
        outputs.set("text", Resource::new("text", json!("slow")));
        Ok(outputs)
    }
}

fn runner() -> (Runner, Arc<MemoryStore>, Arc<MemoryResourceStore>) {
    let store = Arc::new(MemoryStore::new());
    let resources = Arc::new(MemoryResourceStore::new());
    let runner = Runner::new(store.clone(), resources.clone());
    (runner, store, resources)
}

/// emit -> upper -> reverse, outerface on the reverse output.
fn shout_protocol() -> Process {
    let rev = Process::leaf("rev", Arc::new(ReverseTask)).expect("reverse specs");
    let mut subgraph =
        Subgraph::new(vec![emit_process("src"), upper_process("upper"), rev]).expect("members");
    subgraph
        .connect(PortAddr::new("src", "text"), PortAddr::new("upper", "text"))
        .expect("src -> upper");
    subgraph
        .connect(PortAddr::new("upper", "result"), PortAddr::new("rev", "text"))
        .expect("upper -> rev");
    subgraph
        .expose_output("shouted", PortAddr::new("rev", "result"))
        .expect("outerface");
    Process::composite("shout", "shout", subgraph).expect("composite")
}

#[tokio::test]
async fn leaf_run_persists_provenance() {
    let (runner, store, resources) = runner();
    let mut process = emit_process("src");

    let report = runner.run(&mut process).await.expect("run succeeds");

    assert!(process.is_finished());
    assert!(!process.is_running());
    assert_eq!(report.job_ids.len(), 1);

    // The job record points at the persisted process and config, and the
    // output resource carries the job id back.
    let job = store
        .get(&report.job_ids[0])
        .await
        .expect("store read")
        .expect("job record");
    let Record::Job(job) = job else {
        panic!("expected a job record");
    };
    assert!(job.is_finished);
    assert_eq!(job.process_ref, process.id().expect("persisted"));
    assert!(store.exists(&job.config_ref).await.expect("store read"));

    let output = process
        .outputs()
        .resource_map()
        .remove("text")
        .expect("output populated");
    assert!(output.is_saved());
    assert_eq!(output.job_id().as_deref(), Some(report.job_ids[0].as_str()));
    assert!(resources
        .exists(&output.saved_id().expect("saved"))
        .await
        .expect("store read"));
}

#[tokio::test]
async fn protocol_run_propagates_identity_along_connectors() {
    let (runner, _store, _resources) = runner();
    let mut process = shout_protocol();

    let report = runner.run(&mut process).await.expect("run succeeds");

    // One job for the protocol, one per child.
    assert_eq!(report.job_ids.len(), 4);
    assert!(process.is_finished());

    let subgraph = process.subgraph().expect("composite");
    let shouted = process
        .outputs()
        .resource_map()
        .remove("shouted")
        .expect("outerface populated");
    assert_eq!(shouted.payload(), json!("OLLEH"));

    // Propagation copies handles, never data: the consumer sees the exact
    // resource instance the producer made.
    let produced = subgraph
        .process("src")
        .expect("member")
        .outputs()
        .resource_map()
        .remove("text")
        .expect("src output");
    let consumed = subgraph
        .process("upper")
        .expect("member")
        .inputs()
        .resource_map()
        .remove("text")
        .expect("upper input");
    assert!(ResourceRef::same_identity(&produced, &consumed));

    let sink_output = subgraph
        .process("rev")
        .expect("member")
        .outputs()
        .resource_map()
        .remove("result")
        .expect("rev output");
    assert!(ResourceRef::same_identity(&shouted, &sink_output));
}

#[tokio::test]
async fn fan_out_shares_one_instance_across_consumers() {
    let (runner, _store, _resources) = runner();

    let mut subgraph = Subgraph::new(vec![
        emit_process("src"),
        upper_process("a"),
        upper_process("b"),
    ])
    .expect("members");
    subgraph
        .connect(PortAddr::new("src", "text"), PortAddr::new("a", "text"))
        .expect("src -> a");
    subgraph
        .connect(PortAddr::new("src", "text"), PortAddr::new("b", "text"))
        .expect("src -> b");
    let mut process = Process::composite("fan", "fan", subgraph).expect("composite");

    runner.run(&mut process).await.expect("run succeeds");

    let subgraph = process.subgraph().expect("composite");
    let a_in = subgraph
        .process("a")
        .and_then(|p| p.inputs().resource_map().remove("text"))
        .expect("a input");
    let b_in = subgraph
        .process("b")
        .and_then(|p| p.inputs().resource_map().remove("text"))
        .expect("b input");
    assert!(ResourceRef::same_identity(&a_in, &b_in));
}

#[tokio::test]
async fn fan_in_sink_runs_once_after_both_sources_finish() {
    let (runner, _store, _resources) = runner();
    let runs = Arc::new(AtomicUsize::new(0));

    let join =
        Process::leaf("join", Arc::new(CountingJoinTask { runs: runs.clone() })).expect("leaf");
    let mut subgraph =
        Subgraph::new(vec![emit_process("p1"), emit_process("p2"), join]).expect("members");
    subgraph
        .connect(PortAddr::new("p1", "text"), PortAddr::new("join", "left"))
        .expect("p1 -> join");
    subgraph
        .connect(PortAddr::new("p2", "text"), PortAddr::new("join", "right"))
        .expect("p2 -> join");
    let mut process = Process::composite("fanin", "fanin", subgraph).expect("composite");

    runner.run(&mut process).await.expect("run succeeds");

    // The sink fires exactly once, with both inputs in hand.
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let subgraph = process.subgraph().expect("composite");
    let joined = subgraph
        .process("join")
        .and_then(|p| p.outputs().resource_map().remove("result"))
        .expect("join output");
    assert_eq!(joined.payload(), json!("hellohello"));
}

#[tokio::test]
async fn interfaces_feed_external_resources_into_children() {
    let (runner, _store, resources) = runner();

    let mut subgraph = Subgraph::new(vec![concat_process("join")]).expect("member");
    subgraph
        .expose_input("first", PortAddr::new("join", "left"))
        .expect("interface");
    subgraph
        .expose_input("second", PortAddr::new("join", "right"))
        .expect("interface");
    subgraph
        .expose_output("joined", PortAddr::new("join", "result"))
        .expect("outerface");
    let mut process = Process::composite("greet", "greet", subgraph).expect("composite");

    for (face, text) in [("first", "hello"), ("second", "world")] {
        let resource = ResourceRef::new(Resource::new("text", json!(text)));
        resources.save(&resource).await.expect("saved");
        process.set_input(face, resource).expect("interface input");
    }

    runner.run(&mut process).await.expect("run succeeds");

    let joined = process
        .outputs()
        .resource_map()
        .remove("joined")
        .expect("outerface populated");
    assert_eq!(joined.payload(), json!("hello world"));
}

#[tokio::test]
async fn unfed_process_is_not_ready() {
    let (runner, _store, _resources) = runner();
    let mut process = upper_process("upper");

    let err = runner.run(&mut process).await.unwrap_err();
    assert!(matches!(err, RunError::NotReady { .. }));
    assert!(!process.is_running());
}

#[tokio::test]
async fn failed_task_leaves_the_process_visibly_running() {
    let (runner, _store, resources) = runner();
    let mut process = Process::leaf("doomed", Arc::new(FailingTask)).expect("leaf");
    let input = ResourceRef::new(Resource::new("text", json!("in")));
    resources.save(&input).await.expect("saved");
    process.set_input("in", input).expect("input");

    let err = runner.run(&mut process).await.unwrap_err();
    assert!(matches!(err, RunError::Task { .. }));

    // No reaper: the stuck state stays observable and keeps inputs locked.
    assert!(process.is_running());
    assert!(!process.is_finished());
    let late = ResourceRef::new(Resource::new("text", json!("late")));
    assert!(matches!(
        process.set_input("in", late).unwrap_err(),
        RunError::InputLocked { .. }
    ));
}

#[tokio::test]
async fn disconnected_child_stalls_the_protocol() {
    let (runner, _store, _resources) = runner();

    // "orphan" has an input no connector feeds, and without outerfaces the
    // protocol waits for every child.
    let subgraph =
        Subgraph::new(vec![emit_process("src"), upper_process("orphan")]).expect("members");
    let mut process = Process::composite("stuck", "stuck", subgraph).expect("composite");

    let err = runner.run(&mut process).await.unwrap_err();
    match err {
        RunError::Stalled { pending, .. } => {
            assert_eq!(pending, vec!["orphan".to_string()]);
        }
        other => panic!("expected Stalled, got: {}", other),
    }
}

#[tokio::test]
async fn drifted_definition_is_stale() {
    let (runner, _store, _resources) = runner();

    let mut v1 = upper_process("upper");
    let input = ResourceRef::new(Resource::new("text", json!("hi")));
    runner.resources().save(&input).await.expect("saved");
    v1.set_input("text", input.clone()).expect("input");
    runner.run(&mut v1).await.expect("first run");
    let stored_id = v1.id().expect("persisted").to_string();

    // Same stored id, changed implementation version: must refuse to run.
    let mut v2 =
        Process::leaf("upper", Arc::new(VersionedUpperTask { version: 2 })).expect("leaf");
    v2.mark_saved(stored_id, "placeholder".to_string());
    v2.set_input("text", input).expect("input");

    let err = runner.run(&mut v2).await.unwrap_err();
    assert!(matches!(err, RunError::StaleProcess { .. }));
}

#[tokio::test]
async fn rerun_after_reset_keeps_identity_but_mints_a_new_job() {
    let (runner, _store, _resources) = runner();
    let mut process = emit_process("src");

    let first = runner.run(&mut process).await.expect("first run");
    let id = process.id().expect("persisted").to_string();

    process.reset();
    let second = runner.run(&mut process).await.expect("second run");

    assert_eq!(process.id(), Some(id.as_str()));
    assert_ne!(first.job_ids[0], second.job_ids[0]);
}

#[tokio::test]
async fn queue_runs_one_at_a_time_and_tickets_are_job_ids() {
    let (runner, store, _resources) = runner();
    let queue = RunQueue::new(runner);

    let slow = Process::leaf(
        "slow",
        Arc::new(SlowEmitTask {
            delay: Duration::from_millis(250),
        }),
    )
    .expect("leaf");

    let first = queue.add(slow, true).await.expect("admitted");
    let second = queue.add(emit_process("fast"), true).await.expect("admitted");

    assert_eq!(queue.active().await.as_deref(), Some(first.as_str()));
    assert_eq!(queue.waiting().await, vec![second.clone()]);

    // The ticket resolves to a persisted job record.
    assert!(matches!(
        store.get(&first).await.expect("store read"),
        Some(Record::Job(_))
    ));

    let outcome = queue.wait_for(&first).await;
    assert!(outcome.result.is_ok());
    let outcome = queue.wait_for(&second).await;
    assert!(outcome.result.is_ok());
    assert!(outcome.process.expect("returned").is_finished());
    assert_eq!(queue.active().await, None);
}

#[tokio::test]
async fn queue_withdraws_waiting_but_never_active_runs() {
    let (runner, _store, _resources) = runner();
    let queue = RunQueue::new(runner);

    let slow = Process::leaf(
        "slow",
        Arc::new(SlowEmitTask {
            delay: Duration::from_millis(250),
        }),
    )
    .expect("leaf");

    let active = queue.add(slow, true).await.expect("admitted");
    let waiting = queue.add(emit_process("later"), true).await.expect("admitted");

    let err = queue.remove(&active).await.unwrap_err();
    assert!(matches!(err, RunError::AlreadyStarted { .. }));

    let withdrawn = queue.remove(&waiting).await.expect("withdrawn");
    assert_eq!(withdrawn.name(), "later");
    assert!(queue.waiting().await.is_empty());

    let err = queue.remove("no-such-ticket").await.unwrap_err();
    assert!(matches!(err, RunError::NotQueued { .. }));

    queue.wait_for(&active).await;
    queue.shutdown();
}

#[tokio::test]
async fn paused_admission_keeps_the_queue_idle_until_started() {
    let (runner, _store, _resources) = runner();
    let queue = RunQueue::new(runner);

    let ticket = queue
        .add(emit_process("held"), false)
        .await
        .expect("admitted");
    assert_eq!(queue.active().await, None);
    assert_eq!(queue.waiting().await, vec![ticket.clone()]);
    assert!(queue.take_outcome(&ticket).await.is_none());

    queue.start().await;
    assert!(queue.wait_for(&ticket).await.result.is_ok());
    assert_eq!(queue.active().await, None);
    assert!(queue.waiting().await.is_empty());
}

#[tokio::test]
async fn paused_runs_start_in_admission_order() {
    let (runner, _store, _resources) = runner();
    let queue = RunQueue::new(runner);

    let held = Process::leaf(
        "held",
        Arc::new(SlowEmitTask {
            delay: Duration::from_millis(250),
        }),
    )
    .expect("leaf");
    let held = queue.add(held, false).await.expect("admitted");
    assert_eq!(queue.active().await, None);

    // An auto-starting admission wakes the queue; the held run is ahead of it.
    let eager = queue
        .add(emit_process("eager"), true)
        .await
        .expect("admitted");
    assert_eq!(queue.active().await.as_deref(), Some(held.as_str()));
    assert_eq!(queue.waiting().await, vec![eager.clone()]);

    assert!(queue.wait_for(&held).await.result.is_ok());
    assert!(queue.wait_for(&eager).await.result.is_ok());
}
