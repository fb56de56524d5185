// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-process execution events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A process began executing its task body.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use labflow::observability::messages::process::ProcessStarted;
///
/// let msg = ProcessStarted {
///     process: "shout",
///     type_name: "uppercase",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ProcessStarted<'a> {
    pub process: &'a str,
    pub type_name: &'a str,
}

impl Display for ProcessStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Process '{}' ({}) started", self.process, self.type_name)
    }
}

impl StructuredLog for ProcessStarted<'_> {
    fn log(&self) {
        tracing::info!(
            process = self.process,
            type_name = self.type_name,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "process",
            span_name = name,
            process = self.process,
            type_name = self.type_name,
        )
    }
}

/// A process finished and populated its outputs.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ProcessFinished<'a> {
    pub process: &'a str,
    pub output_count: usize,
}

impl Display for ProcessFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Process '{}' finished with {} outputs",
            self.process, self.output_count
        )
    }
}

impl StructuredLog for ProcessFinished<'_> {
    fn log(&self) {
        tracing::info!(
            process = self.process,
            output_count = self.output_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "process_finished",
            span_name = name,
            process = self.process,
            output_count = self.output_count,
        )
    }
}

/// A process task failed. The process is left in its running state so the
/// failure stays visible to callers inspecting the graph.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ProcessFailed<'a> {
    pub process: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ProcessFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Process '{}' failed: {}", self.process, self.error)
    }
}

impl StructuredLog for ProcessFailed<'_> {
    fn log(&self) {
        tracing::error!(
            process = self.process,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "process_failed",
            span_name = name,
            process = self.process,
            error = %self.error,
        )
    }
}

/// A stored process definition no longer matches its recorded hash.
///
/// # Log Level
/// `warn!` - Recoverable by re-persisting the definition
pub struct StaleDefinition<'a> {
    pub process: &'a str,
    pub stored: &'a str,
    pub live: &'a str,
}

impl Display for StaleDefinition<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Process '{}' definition is stale: stored hash {} != live hash {}",
            self.process, self.stored, self.live
        )
    }
}

impl StructuredLog for StaleDefinition<'_> {
    fn log(&self) {
        tracing::warn!(
            process = self.process,
            stored = self.stored,
            live = self.live,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stale_definition",
            span_name = name,
            process = self.process,
            stored = self.stored,
            live = self.live,
        )
    }
}
