// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// One timestamped progress message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressMessage {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// Live status stream for a running process. 1:1 with the process, append-only.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProgressBar {
    process_ref: String,
    messages: Vec<ProgressMessage>,
}

impl ProgressBar {
    pub fn new(process_ref: impl Into<String>) -> Self {
        Self {
            process_ref: process_ref.into(),
            messages: Vec::new(),
        }
    }

    pub fn process_ref(&self) -> &str {
        &self.process_ref
    }

    pub fn append(&mut self, text: impl Into<String>) {
        self.messages.push(ProgressMessage {
            at: Utc::now(),
            text: text.into(),
        });
    }

    pub fn messages(&self) -> &[ProgressMessage] {
        &self.messages
    }
}

/// Shared handle to a progress bar, cloned into the task context so the task
/// body can report progress while the scheduler keeps ownership of the run.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle(Arc<Mutex<ProgressBar>>);

impl ProgressHandle {
    pub fn new(bar: ProgressBar) -> Self {
        Self(Arc::new(Mutex::new(bar)))
    }

    pub fn append(&self, text: impl Into<String>) {
        self.lock().append(text);
    }

    pub fn snapshot(&self) -> ProgressBar {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, ProgressBar> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}
