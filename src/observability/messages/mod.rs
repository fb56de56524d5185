// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for consistent human-readable
//! output and [`StructuredLog`] to emit the same event with structured
//! fields through `tracing`.

pub mod engine;
pub mod process;

use tracing::Span;

/// Emits a message both as a formatted log line and as structured fields.
pub trait StructuredLog {
    /// Logs the event at its intrinsic level with structured fields.
    fn log(&self);

    /// Creates a span carrying the event's fields.
    fn span(&self, name: &str) -> Span;
}
