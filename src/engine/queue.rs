// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Serial run queue.
//!
//! The queue runs at most one process tree at a time; everything else waits
//! in admission order. Admission persists the definition and a not-yet-started
//! job record, so the ticket handed back is the id of the job that will run.
//! A run admitted without auto-start stays in the backlog until the queue is
//! started or the runs ahead of it drain. A waiting run can be withdrawn by
//! its ticket; the active one cannot.

use crate::engine::scheduler::{RunReport, Runner};
use crate::errors::RunError;
use crate::observability::messages::engine::{QueueAdvanced, RunEnqueued};
use crate::observability::messages::StructuredLog;
use crate::process::process::Process;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;

/// Terminal state of a queued run.
#[derive(Debug)]
pub struct QueueOutcome {
    /// The process tree as the run left it. Absent only when the run task
    /// itself was torn down before reporting back.
    pub process: Option<Process>,
    pub result: Result<RunReport, RunError>,
}

struct PendingRun {
    job_id: String,
    process: Process,
}

#[derive(Default)]
struct QueueState {
    backlog: VecDeque<PendingRun>,
    active: Option<String>,
    finished: HashMap<String, QueueOutcome>,
}

struct QueueInner {
    runner: Runner,
    state: Mutex<QueueState>,
    completed: Notify,
    shutdown: CancellationToken,
}

/// One-at-a-time run queue over a shared [`Runner`].
#[derive(Clone)]
pub struct RunQueue {
    inner: Arc<QueueInner>,
}

impl RunQueue {
    pub fn new(runner: Runner) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                runner,
                state: Mutex::new(QueueState::default()),
                completed: Notify::new(),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Admits a run and returns the job id as the queue ticket. With
    /// `auto_start` the queue begins executing as soon as it is idle; without
    /// it the run just joins the backlog and waits for [`RunQueue::start`] or
    /// for runs ahead of it to drain.
    pub async fn add(&self, mut process: Process, auto_start: bool) -> Result<String, RunError> {
        let job_id = self.inner.runner.prepare_job(&mut process).await?;

        let backlog = {
            let mut state = self.inner.state.lock().await;
            state.backlog.push_back(PendingRun {
                job_id: job_id.clone(),
                process,
            });
            if auto_start {
                self.promote(&mut state);
            }
            state.backlog.len()
        };

        RunEnqueued {
            job_id: &job_id,
            backlog,
        }
        .log();
        Ok(job_id)
    }

    /// Begins executing the next waiting run. A no-op while a run is already
    /// active, after shutdown, or when nothing is waiting.
    pub async fn start(&self) {
        let mut state = self.inner.state.lock().await;
        self.promote(&mut state);
    }

    fn promote(&self, state: &mut QueueState) {
        if state.active.is_some() || self.inner.shutdown.is_cancelled() {
            return;
        }
        if let Some(pending) = state.backlog.pop_front() {
            state.active = Some(pending.job_id.clone());
            self.spawn_run(pending.job_id, pending.process);
        }
    }

    /// Withdraws a waiting run, returning its process tree. The active run
    /// cannot be withdrawn; an unknown ticket is an error.
    pub async fn remove(&self, job_id: &str) -> Result<Process, RunError> {
        let mut state = self.inner.state.lock().await;
        if state.active.as_deref() == Some(job_id) || state.finished.contains_key(job_id) {
            return Err(RunError::AlreadyStarted {
                id: job_id.to_string(),
            });
        }
        let position = state.backlog.iter().position(|p| p.job_id == job_id);
        match position {
            Some(index) => {
                let pending = state
                    .backlog
                    .remove(index)
                    .ok_or_else(|| RunError::NotQueued {
                        id: job_id.to_string(),
                    })?;
                Ok(pending.process)
            }
            None => Err(RunError::NotQueued {
                id: job_id.to_string(),
            }),
        }
    }

    /// Ticket of the run currently executing, if any.
    pub async fn active(&self) -> Option<String> {
        self.inner.state.lock().await.active.clone()
    }

    /// Tickets waiting behind the active run, in admission order.
    pub async fn waiting(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .await
            .backlog
            .iter()
            .map(|p| p.job_id.clone())
            .collect()
    }

    /// Claims the outcome of a finished run, if it finished already.
    pub async fn take_outcome(&self, job_id: &str) -> Option<QueueOutcome> {
        self.inner.state.lock().await.finished.remove(job_id)
    }

    /// Waits until the given run finishes and claims its outcome.
    pub async fn wait_for(&self, job_id: &str) -> QueueOutcome {
        loop {
            let notified = self.inner.completed.notified();
            if let Some(outcome) = self.take_outcome(job_id).await {
                return outcome;
            }
            notified.await;
        }
    }

    /// Stops promoting waiting runs. The active run finishes on its own.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    fn spawn_run(&self, job_id: String, process: Process) {
        let queue = self.clone();
        tokio::spawn(async move {
            let handle = queue.inner.runner.spawn(process);
            let outcome = match handle.join().await {
                Ok((process, result)) => QueueOutcome {
                    process: Some(process),
                    result,
                },
                Err(err) => QueueOutcome {
                    process: None,
                    result: Err(err),
                },
            };

            let next = {
                let mut state = queue.inner.state.lock().await;
                state.finished.insert(job_id, outcome);
                state.active = None;
                if queue.inner.shutdown.is_cancelled() {
                    None
                } else {
                    state.backlog.pop_front().map(|pending| {
                        state.active = Some(pending.job_id.clone());
                        pending
                    })
                }
            };
            queue.inner.completed.notify_waiters();

            if let Some(pending) = next {
                QueueAdvanced {
                    job_id: &pending.job_id,
                }
                .log();
                queue.spawn_run(pending.job_id, pending.process);
            }
        });
    }
}
