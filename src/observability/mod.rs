// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Diagnostic and operational events are struct-based messages with a
//! `Display` implementation, so the human-readable text and the structured
//! fields come from one place instead of magic strings scattered through the
//! engine.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - run scheduler and queue lifecycle events
//! * `messages::process` - per-process execution events

pub mod messages;
