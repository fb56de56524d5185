// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run scheduler and queue lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A run started for a root process.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use labflow::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted {
///     process: "shout",
///     type_name: "uppercase",
///     max_concurrency: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub process: &'a str,
    pub type_name: &'a str,
    pub max_concurrency: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting run of '{}' ({}): max_concurrency={}",
            self.process, self.type_name, self.max_concurrency
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            process = self.process,
            type_name = self.type_name,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            process = self.process,
            type_name = self.type_name,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// A run completed successfully.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted<'a> {
    pub process: &'a str,
    pub job_count: usize,
    pub duration: std::time::Duration,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run of '{}' completed: {} jobs in {:?}",
            self.process, self.job_count, self.duration
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            process = self.process,
            job_count = self.job_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_completed",
            span_name = name,
            process = self.process,
            job_count = self.job_count,
            duration = ?self.duration,
        )
    }
}

/// A run failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunFailed<'a> {
    pub process: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run of '{}' failed: {}", self.process, self.error)
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            process = self.process,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run_failed",
            span_name = name,
            process = self.process,
            error = %self.error,
        )
    }
}

/// A run stalled: no child is ready, running, or able to become ready.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunStalled<'a> {
    pub process: &'a str,
    pub pending: &'a [String],
}

impl Display for RunStalled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run of '{}' stalled: {} children can never become ready",
            self.process,
            self.pending.len()
        )
    }
}

impl StructuredLog for RunStalled<'_> {
    fn log(&self) {
        tracing::error!(
            process = self.process,
            pending = ?self.pending,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run_stalled",
            span_name = name,
            process = self.process,
            pending = ?self.pending,
        )
    }
}

/// A run was admitted to the queue.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use labflow::observability::messages::engine::RunEnqueued;
///
/// let msg = RunEnqueued {
///     job_id: "4c1e...",
///     backlog: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunEnqueued<'a> {
    pub job_id: &'a str,
    pub backlog: usize,
}

impl Display for RunEnqueued<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Enqueued job {}: {} waiting ahead",
            self.job_id, self.backlog
        )
    }
}

impl StructuredLog for RunEnqueued<'_> {
    fn log(&self) {
        tracing::info!(
            job_id = self.job_id,
            backlog = self.backlog,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_enqueued",
            span_name = name,
            job_id = self.job_id,
            backlog = self.backlog,
        )
    }
}

/// The queue promoted the next waiting run to active.
///
/// # Log Level
/// `info!` - Important operational event
pub struct QueueAdvanced<'a> {
    pub job_id: &'a str,
}

impl Display for QueueAdvanced<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Queue advanced: job {} is now active", self.job_id)
    }
}

impl StructuredLog for QueueAdvanced<'_> {
    fn log(&self) {
        tracing::info!(job_id = self.job_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("queue_advanced", span_name = name, job_id = self.job_id)
    }
}
