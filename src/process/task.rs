// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::progress::ProgressHandle;
use crate::errors::{ConfigError, RunError, TaskError};
use crate::graph::port::PortSpec;
use crate::graph::resource::{Resource, ResourceRef};
use crate::process::config::{Config, ConfigSpecs};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything a task body may look at: input resources, resolved config
/// params and a progress handle. The scheduler keeps ownership of the process
/// itself; the context is a read-only snapshot taken at start time.
pub struct TaskContext {
    process: String,
    inputs: BTreeMap<String, ResourceRef>,
    config: Config,
    progress: ProgressHandle,
}

impl TaskContext {
    pub(crate) fn new(
        process: impl Into<String>,
        inputs: BTreeMap<String, ResourceRef>,
        config: Config,
        progress: ProgressHandle,
    ) -> Self {
        Self {
            process: process.into(),
            inputs,
            config,
            progress,
        }
    }

    pub fn process_name(&self) -> &str {
        &self.process
    }

    /// Input resource by port name.
    pub fn input(&self, name: &str) -> Result<ResourceRef, RunError> {
        self.inputs
            .get(name)
            .cloned()
            .ok_or_else(|| RunError::UnknownPort {
                process: self.process.clone(),
                port: name.to_string(),
            })
    }

    pub fn inputs(&self) -> &BTreeMap<String, ResourceRef> {
        &self.inputs
    }

    /// Resolved config param (explicit value or spec default).
    pub fn param(&self, name: &str) -> Result<Value, ConfigError> {
        self.config.get_param(name)
    }

    /// Appends a timestamped message to the run's progress bar.
    pub fn progress(&self, text: impl Into<String>) {
        self.progress.append(text);
    }
}

/// Resources a task produced, keyed by output port name.
///
/// Every required output port must be populated before the task returns;
/// optional ports may stay empty.
#[derive(Default)]
pub struct TaskOutputs {
    resources: BTreeMap<String, ResourceRef>,
}

impl TaskOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a freshly produced resource for the named port.
    pub fn set(&mut self, port: impl Into<String>, resource: Resource) {
        self.resources.insert(port.into(), ResourceRef::new(resource));
    }

    /// Places an existing handle on the named port. Used by tasks that pass
    /// an input through unchanged.
    pub fn set_ref(&mut self, port: impl Into<String>, resource: ResourceRef) {
        self.resources.insert(port.into(), resource);
    }

    pub fn get(&self, port: &str) -> Option<&ResourceRef> {
        self.resources.get(port)
    }

    pub fn into_map(self) -> BTreeMap<String, ResourceRef> {
        self.resources
    }
}

/// Capability interface of a leaf process: declared ports and config plus the
/// task body. Lifecycle hooks are fixed virtual methods rather than a keyed
/// hook table; `before_run` fires before the job is persisted, `after_run`
/// after the task body succeeds.
#[async_trait]
pub trait ProcessTask: Send + Sync {
    /// Stable type name, resolvable through the task registry.
    fn type_name(&self) -> &str;

    /// Bumped whenever the implementation changes behavior; feeds the
    /// identity hash alongside the declared structure.
    fn version(&self) -> u32 {
        1
    }

    fn input_specs(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    fn config_specs(&self) -> ConfigSpecs {
        ConfigSpecs::new()
    }

    async fn before_run(&self, _ctx: &TaskContext) -> Result<(), TaskError> {
        Ok(())
    }

    /// The task body: reads inputs, returns populated outputs.
    async fn task(&self, ctx: &TaskContext) -> Result<TaskOutputs, TaskError>;

    async fn after_run(&self, _ctx: &TaskContext) -> Result<(), TaskError> {
        Ok(())
    }
}
