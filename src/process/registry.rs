// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::process::task::ProcessTask;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Explicit task-type registry: stable type name to shared task instance.
///
/// Stored definitions resolve their type names through an injected registry
/// rather than any global table, so registration happens deterministically at
/// composition time and two registries can coexist (e.g. one per tenant).
#[derive(Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Arc<dyn ProcessTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task under its own type name. Re-registering a name
    /// replaces the previous entry.
    pub fn register(&mut self, task: Arc<dyn ProcessTask>) {
        self.tasks.insert(task.type_name().to_string(), task);
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<dyn ProcessTask>> {
        self.tasks.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.tasks.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &String> {
        self.tasks.keys()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("task_count", &self.tasks.len())
            .field("type_names", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}
