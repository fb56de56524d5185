// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run scheduler.
//!
//! One [`Runner`] drives one process tree per run. Leaf runs execute the task
//! body inline; composite runs own an explicit ready queue and a single
//! scheduling loop: ready children are moved out of the subgraph into spawned
//! tasks, and every completion comes back over one channel, so all graph
//! mutation happens in the loop that owns the tree.
//!
//! Persistence happens at the run boundary: process, config, job and progress
//! records are committed atomically before the task body starts, and output
//! resources are saved (and linked to the job) before downstream processes
//! can observe them.

use crate::engine::job::Job;
use crate::engine::progress::{ProgressBar, ProgressHandle};
use crate::errors::RunError;
use crate::graph::port::PortAddr;
use crate::identity::{ProcessHasher, StructuralHasher};
use crate::observability::messages::engine::{RunCompleted, RunFailed, RunStalled, RunStarted};
use crate::observability::messages::process::{
    ProcessFailed, ProcessFinished, ProcessStarted, StaleDefinition,
};
use crate::observability::messages::StructuredLog;
use crate::process::process::{Process, ProcessKind};
use crate::process::task::TaskContext;
use crate::store::{
    ConfigRecord, ProcessRecord, ProgressRecord, ProtocolShape, Record, ResourceStore, Store,
    WriteBatch,
};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Outcome of one completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Ids of every job the run created, root first.
    pub job_ids: Vec<String>,
    pub elapsed: Duration,
}

/// Handle to a run executing in a background task.
pub struct RunHandle {
    name: String,
    handle: tokio::task::JoinHandle<(Process, Result<RunReport, RunError>)>,
}

impl RunHandle {
    pub fn process_name(&self) -> &str {
        &self.name
    }

    /// Waits for the run, returning the process tree together with the
    /// run outcome.
    pub async fn join(self) -> Result<(Process, Result<RunReport, RunError>), RunError> {
        self.handle.await.map_err(|e| RunError::Task {
            process: self.name,
            source: Box::new(e),
        })
    }
}

/// Executes process trees against injected persistence collaborators.
#[derive(Clone)]
pub struct Runner {
    store: Arc<dyn Store>,
    resources: Arc<dyn ResourceStore>,
    hasher: Arc<dyn ProcessHasher>,
    max_concurrency: usize,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl Runner {
    pub fn new(store: Arc<dyn Store>, resources: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            resources,
            hasher: Arc::new(StructuralHasher),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn ProcessHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn resources(&self) -> &Arc<dyn ResourceStore> {
        &self.resources
    }

    /// Runs the process tree to completion.
    ///
    /// On failure the failing process is left with `is_running == true` so the
    /// stuck state stays visible when inspecting the tree afterwards.
    pub async fn run(&self, process: &mut Process) -> Result<RunReport, RunError> {
        let started = Instant::now();
        RunStarted {
            process: process.name(),
            type_name: process.type_name(),
            max_concurrency: self.max_concurrency,
        }
        .log();

        match self.drive(process).await {
            Ok(job_ids) => {
                let elapsed = started.elapsed();
                RunCompleted {
                    process: process.name(),
                    job_count: job_ids.len(),
                    duration: elapsed,
                }
                .log();
                Ok(RunReport { job_ids, elapsed })
            }
            Err(err) => {
                RunFailed {
                    process: process.name(),
                    error: &err,
                }
                .log();
                Err(err)
            }
        }
    }

    /// Moves the process into a background task and runs it there.
    pub fn spawn(&self, mut process: Process) -> RunHandle {
        let name = process.name().to_string();
        let runner = self.clone();
        let handle = tokio::spawn(async move {
            let result = runner.run(&mut process).await;
            (process, result)
        });
        RunHandle { name, handle }
    }

    /// Persists the definition and a not-yet-started job record, returning
    /// the job id. Used by the queue to hand out a ticket before the run
    /// actually starts; the run later reuses the attached job id.
    pub(crate) async fn prepare_job(&self, process: &mut Process) -> Result<String, RunError> {
        if !process.is_ready() {
            return Err(RunError::NotReady {
                name: process.name().to_string(),
            });
        }
        process.config_mut();
        self.persist_definition(process).await?;

        let mut job = Job::for_process(process)?;
        job.assign_id(Uuid::new_v4().to_string());
        let job_id = job.id().unwrap_or_default().to_string();
        process.attach_job(job_id.clone());

        let mut batch = WriteBatch::new();
        batch.push(Record::Process(process_record(process)));
        batch.push(Record::Config(config_record(process)));
        batch.push(Record::Job(job.record()));
        self.store.commit(batch).await?;
        Ok(job_id)
    }

    /// Persists everything a run needs before the task body may start, and
    /// returns the started job. The commit is atomic: process, config, job
    /// and progress records land together or not at all.
    pub(crate) async fn open_job(
        &self,
        process: &mut Process,
        progress: &ProgressHandle,
    ) -> Result<Job, RunError> {
        if !process.is_ready() {
            return Err(RunError::NotReady {
                name: process.name().to_string(),
            });
        }

        self.persist_definition(process).await?;

        let mut job = Job::for_process(process)?;
        // A queued run already carries its job id; fresh runs mint one here.
        let job_id = process
            .job_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        job.assign_id(job_id.clone());
        job.start();
        process.attach_job(job_id);
        process.mark_running();

        let mut batch = WriteBatch::new();
        batch.push(Record::Process(process_record(process)));
        batch.push(Record::Config(config_record(process)));
        batch.push(Record::Job(job.record()));
        batch.push(Record::Progress(progress_record(process, progress)));
        self.store.commit(batch).await?;

        Ok(job)
    }

    /// Assigns the identity hash and storage id, or verifies them against the
    /// stored record when the process was persisted before. A hash mismatch
    /// means the live definition drifted from what the store remembers.
    async fn persist_definition(&self, process: &mut Process) -> Result<(), RunError> {
        let live = self.hasher.hash(&process.identity_snapshot())?;

        if let Some(id) = process.id() {
            let stored = match self.store.get(id).await? {
                Some(Record::Process(record)) => record.hash,
                _ => {
                    return Err(RunError::Store(crate::errors::StoreError::NotFound(
                        id.to_string(),
                    )))
                }
            };
            if stored != live {
                StaleDefinition {
                    process: process.name(),
                    stored: &stored,
                    live: &live,
                }
                .log();
                return Err(RunError::StaleProcess {
                    name: process.name().to_string(),
                    stored,
                    live,
                });
            }
            return Ok(());
        }

        process.mark_saved(Uuid::new_v4().to_string(), live);
        let config = process.config_mut();
        if !config.is_saved() {
            config.mark_saved(Uuid::new_v4().to_string());
        }
        Ok(())
    }

    /// Final record updates after a successful run.
    async fn close_job(
        &self,
        process: &Process,
        job: &mut Job,
        progress: &ProgressHandle,
    ) -> Result<(), RunError> {
        job.finish();
        let mut batch = WriteBatch::new();
        batch.push(Record::Process(process_record(process)));
        batch.push(Record::Job(job.record()));
        batch.push(Record::Progress(progress_record(process, progress)));
        self.store.commit(batch).await?;
        Ok(())
    }

    /// Dispatches on process kind. Boxed so composite runs can recurse
    /// through spawned child runs.
    fn drive<'a>(
        &'a self,
        process: &'a mut Process,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, RunError>> + Send + 'a>> {
        Box::pin(async move {
            match process.kind() {
                ProcessKind::Leaf(_) => self.run_leaf(process).await,
                ProcessKind::Composite(_) => self.run_composite(process).await,
            }
        })
    }

    async fn run_leaf(&self, process: &mut Process) -> Result<Vec<String>, RunError> {
        let task = match process.kind() {
            ProcessKind::Leaf(task) => Arc::clone(task),
            ProcessKind::Composite(_) => {
                return Err(RunError::NotReady {
                    name: process.name().to_string(),
                })
            }
        };

        // Ensure the config exists before readiness gating so defaults apply
        // even when the caller never touched a param.
        process.config_mut();

        let progress = ProgressHandle::new(ProgressBar::new(process.name()));
        let mut job = self.open_job(process, &progress).await?;
        let job_id = job.id().unwrap_or_default().to_string();

        ProcessStarted {
            process: process.name(),
            type_name: process.type_name(),
        }
        .log();

        let ctx = TaskContext::new(
            process.name(),
            process.inputs().resource_map(),
            process.config().cloned().unwrap_or_default(),
            progress.clone(),
        );

        let outputs = self.execute_task(process, task.as_ref(), &ctx).await?;

        for (port, resource) in outputs {
            process.set_output(&port, resource)?;
        }
        if let Some(port) = process.outputs().missing_required().into_iter().next() {
            return Err(RunError::MissingOutput {
                process: process.name().to_string(),
                port,
            });
        }

        for (_, resource) in process.outputs().resource_map() {
            self.resources.save(&resource).await?;
            resource.link_job(job_id.clone());
        }

        process.mark_finished();
        self.close_job(process, &mut job, &progress).await?;

        ProcessFinished {
            process: process.name(),
            output_count: process.outputs().resource_map().len(),
        }
        .log();

        Ok(vec![job_id])
    }

    /// Runs the hook/task sequence, mapping task failures and leaving the
    /// process running on error.
    async fn execute_task(
        &self,
        process: &Process,
        task: &dyn crate::process::task::ProcessTask,
        ctx: &TaskContext,
    ) -> Result<std::collections::BTreeMap<String, crate::graph::resource::ResourceRef>, RunError>
    {
        let run = async {
            task.before_run(ctx).await?;
            let outputs = task.task(ctx).await?;
            task.after_run(ctx).await?;
            Ok::<_, crate::errors::TaskError>(outputs)
        };
        match run.await {
            Ok(outputs) => Ok(outputs.into_map()),
            Err(source) => {
                let err = RunError::Task {
                    process: process.name().to_string(),
                    source,
                };
                ProcessFailed {
                    process: process.name(),
                    error: &err,
                }
                .log();
                Err(err)
            }
        }
    }

    async fn run_composite(&self, process: &mut Process) -> Result<Vec<String>, RunError> {
        let progress = ProgressHandle::new(ProgressBar::new(process.name()));
        let mut job = self.open_job(process, &progress).await?;
        let mut job_ids = vec![job.id().unwrap_or_default().to_string()];

        ProcessStarted {
            process: process.name(),
            type_name: process.type_name(),
        }
        .log();

        self.bind_interfaces(process)?;

        let name = process.name().to_string();
        match self.drive_subgraph(process, &progress, &mut job_ids).await {
            Ok(()) => {}
            Err(err) => {
                ProcessFailed {
                    process: &name,
                    error: &err,
                }
                .log();
                return Err(err);
            }
        }

        self.derive_outerfaces(process)?;
        if let Some(port) = process.outputs().missing_required().into_iter().next() {
            return Err(RunError::MissingOutput {
                process: name,
                port,
            });
        }

        process.mark_finished();
        self.close_job(process, &mut job, &progress).await?;

        ProcessFinished {
            process: process.name(),
            output_count: process.outputs().resource_map().len(),
        }
        .log();

        Ok(job_ids)
    }

    /// Copies resources held on the composite's own inputs down to the child
    /// ports each interface names. Propagation copies handles, not data.
    fn bind_interfaces(&self, process: &mut Process) -> Result<(), RunError> {
        let held = process.inputs().resource_map();
        let bindings: Vec<(String, PortAddr)> = process
            .subgraph()
            .map(|s| {
                s.interfaces()
                    .iter()
                    .map(|(face, addr)| (face.clone(), addr.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for (face, addr) in bindings {
            let Some(resource) = held.get(&face) else {
                continue;
            };
            if let Some(subgraph) = process.subgraph_mut() {
                if let Some(child) = subgraph.process_mut(&addr.process) {
                    child.set_input(&addr.port, resource.clone())?;
                }
            }
        }
        Ok(())
    }

    /// The scheduling loop: spawns ready children up to the concurrency cap,
    /// applies each completion to the tree, propagates outputs along
    /// connectors and wakes whatever became ready.
    async fn drive_subgraph(
        &self,
        process: &mut Process,
        progress: &ProgressHandle,
        job_ids: &mut Vec<String>,
    ) -> Result<(), RunError> {
        let name = process.name().to_string();
        let mut ready: VecDeque<String> = process
            .subgraph()
            .map(|s| {
                s.processes()
                    .values()
                    .filter(|p| p.is_ready())
                    .map(|p| p.name().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let (tx, mut rx) = mpsc::channel::<(Process, Result<Vec<String>, RunError>)>(
            self.max_concurrency.max(1),
        );
        let mut in_flight = 0usize;

        loop {
            while in_flight < self.max_concurrency {
                let Some(child_name) = ready.pop_front() else {
                    break;
                };
                let Some(mut child) = process
                    .subgraph_mut()
                    .and_then(|s| s.take_process(&child_name))
                else {
                    continue;
                };
                let runner = self.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = runner.drive(&mut child).await;
                    let _ = tx.send((child, result)).await;
                });
                in_flight += 1;
            }

            if in_flight == 0 {
                break;
            }

            let Some((child, result)) = rx.recv().await else {
                break;
            };
            in_flight -= 1;

            let child_name = child.name().to_string();
            let outputs = child.outputs().resource_map();
            if let Some(subgraph) = process.subgraph_mut() {
                subgraph.put_process(child);
            }

            let ids = result?;
            job_ids.extend(ids);
            progress.append(format!("'{}' finished", child_name));

            let edges: Vec<(String, PortAddr)> = process
                .subgraph()
                .map(|s| {
                    s.connectors_from(&child_name)
                        .into_iter()
                        .map(|c| (c.from.port.clone(), c.to.clone()))
                        .collect()
                })
                .unwrap_or_default();

            for (port, to) in &edges {
                let Some(resource) = outputs.get(port) else {
                    continue;
                };
                if let Some(subgraph) = process.subgraph_mut() {
                    if let Some(target) = subgraph.process_mut(&to.process) {
                        target.set_input(&to.port, resource.clone())?;
                    }
                }
            }

            if let Some(subgraph) = process.subgraph() {
                for (_, to) in &edges {
                    let became_ready = subgraph
                        .process(&to.process)
                        .map(|p| p.is_ready())
                        .unwrap_or(false);
                    if became_ready && !ready.contains(&to.process) {
                        ready.push_back(to.process.clone());
                    }
                }
            }

            if self.sinks_finished(process) {
                // Drain anything still in flight, but start nothing new.
                ready.clear();
            }
        }

        if !self.sinks_finished(process) {
            let pending: Vec<String> = process
                .subgraph()
                .map(|s| {
                    s.processes()
                        .values()
                        .filter(|p| !p.is_finished())
                        .map(|p| p.name().to_string())
                        .collect()
                })
                .unwrap_or_default();
            RunStalled {
                process: &name,
                pending: &pending,
            }
            .log();
            return Err(RunError::Stalled { name, pending });
        }
        Ok(())
    }

    fn sinks_finished(&self, process: &Process) -> bool {
        process
            .subgraph()
            .map(|s| {
                s.sink_names().iter().all(|name| {
                    s.process(name).map(|p| p.is_finished()).unwrap_or(false)
                })
            })
            .unwrap_or(true)
    }

    /// Surfaces child outputs on the composite's own output ports, one per
    /// declared outerface. Handles are shared, so downstream consumers see
    /// the exact resource the child produced.
    fn derive_outerfaces(&self, process: &mut Process) -> Result<(), RunError> {
        let faces: Vec<(String, PortAddr)> = process
            .subgraph()
            .map(|s| {
                s.outerfaces()
                    .iter()
                    .map(|(face, addr)| (face.clone(), addr.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for (face, addr) in faces {
            let resource = process
                .subgraph()
                .and_then(|s| s.process(&addr.process))
                .and_then(|p| p.outputs().resource_map().get(&addr.port).cloned());
            if let Some(resource) = resource {
                process.set_output(&face, resource)?;
            }
        }
        Ok(())
    }
}

fn process_record(process: &Process) -> ProcessRecord {
    let protocol = process.subgraph().map(|s| ProtocolShape {
        processes: s.child_types(),
        connectors: s.connectors().to_vec(),
        interfaces: s.interfaces().clone(),
        outerfaces: s.outerfaces().clone(),
    });
    ProcessRecord {
        id: process.id().map(str::to_string),
        name: process.name().to_string(),
        type_name: process.type_name().to_string(),
        hash: process.hash().unwrap_or_default().to_string(),
        is_running: process.is_running(),
        is_finished: process.is_finished(),
        input_specs: process.inputs().specs(),
        output_specs: process.outputs().specs(),
        config_specs: process.config_specs().clone(),
        protocol,
    }
}

fn config_record(process: &Process) -> ConfigRecord {
    match process.config() {
        Some(config) => ConfigRecord {
            id: config.id().map(str::to_string),
            specs: config.specs().clone(),
            params: config.params().clone(),
        },
        None => ConfigRecord {
            id: None,
            specs: process.config_specs().clone(),
            params: Default::default(),
        },
    }
}

fn progress_record(process: &Process, progress: &ProgressHandle) -> ProgressRecord {
    ProgressRecord {
        id: process.id().map(|id| format!("progress-{}", id)),
        process_ref: process.id().unwrap_or_default().to_string(),
        messages: progress.snapshot().messages().to_vec(),
    }
}
