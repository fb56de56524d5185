// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Process lifecycle and identity.
//!
//! A process is either a leaf (a registered task implementation) or a
//! composite (a protocol subgraph); both share the same lifecycle:
//!
//! ```text
//! CREATED --run--> RUNNING --task ok--> FINISHED --reset--> CREATED
//!                     |
//!                     +--task err--> left RUNNING (stuck, caller-visible)
//! ```
//!
//! Identity is the pair (type name, content hash). The hash covers the
//! serialized structural definition — port specs, config specs, version and,
//! for composites, the child/connector shape — so a stored process whose
//! definition drifted is detected as stale before it can run.

use crate::errors::{ConfigError, DefinitionError, RunError};
use crate::graph::io::{Inputs, Outputs};
use crate::graph::port::PortSpec;
use crate::graph::resource::ResourceRef;
use crate::identity::IdentitySnapshot;
use crate::process::config::{Config, ConfigSpecs};
use crate::process::protocol::Subgraph;
use crate::process::task::ProcessTask;
use crate::validator::ParamValidator;
use serde_json::Value;
use std::sync::Arc;

/// Leaf task or composite subgraph.
pub enum ProcessKind {
    Leaf(Arc<dyn ProcessTask>),
    Composite(Subgraph),
}

impl std::fmt::Debug for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessKind::Leaf(task) => f.debug_tuple("Leaf").field(&task.type_name()).finish(),
            ProcessKind::Composite(subgraph) => f
                .debug_struct("Composite")
                .field("processes", &subgraph.processes().len())
                .field("connectors", &subgraph.connectors().len())
                .finish(),
        }
    }
}

/// Execution unit: declared IO, lazily-created config, lifecycle flags and
/// identity. Built once from its task's (or subgraph's) declared specs; the
/// port shape freezes as soon as the process starts.
#[derive(Debug)]
pub struct Process {
    name: String,
    type_name: String,
    version: u32,
    kind: ProcessKind,
    inputs: Inputs,
    outputs: Outputs,
    config_specs: ConfigSpecs,
    config: Option<Config>,
    is_running: bool,
    is_finished: bool,
    id: Option<String>,
    job_id: Option<String>,
    hash: Option<String>,
}

impl Process {
    /// Builds a leaf process from a task implementation.
    pub fn leaf(name: impl Into<String>, task: Arc<dyn ProcessTask>) -> Result<Self, DefinitionError> {
        let inputs = Inputs::from_specs(&task.input_specs())?;
        let outputs = Outputs::from_specs(&task.output_specs())?;
        Ok(Self {
            name: name.into(),
            type_name: task.type_name().to_string(),
            version: task.version(),
            config_specs: task.config_specs(),
            kind: ProcessKind::Leaf(task),
            inputs,
            outputs,
            config: None,
            is_running: false,
            is_finished: false,
            id: None,
            job_id: None,
            hash: None,
        })
    }

    /// Builds a composite process (protocol) from a validated subgraph.
    /// Its own ports are derived from the subgraph's interfaces/outerfaces.
    pub fn composite(
        name: impl Into<String>,
        type_name: impl Into<String>,
        subgraph: Subgraph,
    ) -> Result<Self, DefinitionError> {
        let inputs = Inputs::from_specs(&subgraph.interface_specs())?;
        let outputs = Outputs::from_specs(&subgraph.outerface_specs())?;
        Ok(Self {
            name: name.into(),
            type_name: type_name.into(),
            version: 1,
            config_specs: ConfigSpecs::new(),
            kind: ProcessKind::Composite(subgraph),
            inputs,
            outputs,
            config: None,
            is_running: false,
            is_finished: false,
            id: None,
            job_id: None,
            hash: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn kind(&self) -> &ProcessKind {
        &self.kind
    }

    pub fn task(&self) -> Option<&Arc<dyn ProcessTask>> {
        match &self.kind {
            ProcessKind::Leaf(task) => Some(task),
            ProcessKind::Composite(_) => None,
        }
    }

    pub fn subgraph(&self) -> Option<&Subgraph> {
        match &self.kind {
            ProcessKind::Composite(subgraph) => Some(subgraph),
            ProcessKind::Leaf(_) => None,
        }
    }

    pub(crate) fn subgraph_mut(&mut self) -> Option<&mut Subgraph> {
        match &mut self.kind {
            ProcessKind::Composite(subgraph) => Some(subgraph),
            ProcessKind::Leaf(_) => None,
        }
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut Inputs {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut Outputs {
        &mut self.outputs
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Ready to run: idle, not yet finished, every declared input ready.
    /// A process with no inputs is trivially ready.
    pub fn is_ready(&self) -> bool {
        !self.is_running && !self.is_finished && self.inputs.all_ready()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub(crate) fn mark_saved(&mut self, id: String, hash: String) {
        self.id = Some(id);
        self.hash = Some(hash);
    }

    pub(crate) fn attach_job(&mut self, job_id: String) {
        self.job_id = Some(job_id);
    }

    pub(crate) fn mark_running(&mut self) {
        self.is_running = true;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.is_running = false;
        self.is_finished = true;
    }

    /// Adds an input port. Ports are structurally frozen once the process
    /// has started or finished.
    pub fn add_input_port(&mut self, spec: PortSpec) -> Result<(), DefinitionError> {
        self.check_shape_open()?;
        self.inputs.add_port(spec)
    }

    /// Adds an output port, same freezing rule as [`Self::add_input_port`].
    pub fn add_output_port(&mut self, spec: PortSpec) -> Result<(), DefinitionError> {
        self.check_shape_open()?;
        self.outputs.add_port(spec)
    }

    fn check_shape_open(&self) -> Result<(), DefinitionError> {
        if self.is_running || self.is_finished {
            return Err(DefinitionError::ShapeFrozen {
                process: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Places a resource on an input port. Rejected while the process runs.
    pub fn set_input(&mut self, port: &str, resource: ResourceRef) -> Result<(), RunError> {
        if self.is_running {
            return Err(RunError::InputLocked {
                process: self.name.clone(),
                port: port.to_string(),
            });
        }
        self.inputs.set_resource(&self.name, port, resource)
    }

    /// Places a resource on an output port. Rejected once the process finished.
    pub fn set_output(&mut self, port: &str, resource: ResourceRef) -> Result<(), RunError> {
        if self.is_finished {
            return Err(RunError::OutputLocked {
                process: self.name.clone(),
                port: port.to_string(),
            });
        }
        self.outputs.set_resource(&self.name, port, resource)
    }

    /// The config, created on first access from the declared specs.
    pub fn config_mut(&mut self) -> &mut Config {
        self.config
            .get_or_insert_with(|| Config::new(self.config_specs.clone()))
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn config_specs(&self) -> &ConfigSpecs {
        &self.config_specs
    }

    /// Validates and sets a config param, creating the config if needed.
    pub fn set_param(
        &mut self,
        name: &str,
        raw: Value,
        validator: &dyn ParamValidator,
    ) -> Result<(), ConfigError> {
        self.config_mut().set_param(name, raw, validator)
    }

    /// Returns the process to a runnable state: flags cleared, outputs
    /// emptied, job detached. Inputs keep their resources so a re-run sees
    /// the same feed. Recurses into composite children.
    pub fn reset(&mut self) {
        self.is_running = false;
        self.is_finished = false;
        self.job_id = None;
        self.outputs.clear_resources();
        if let ProcessKind::Composite(subgraph) = &mut self.kind {
            let names: Vec<String> = subgraph.processes().keys().cloned().collect();
            for name in names {
                if let Some(child) = subgraph.process_mut(&name) {
                    child.reset();
                    child.inputs_mut().clear_resources();
                }
            }
        }
    }

    /// Structural definition snapshot feeding the identity hash.
    pub fn identity_snapshot(&self) -> IdentitySnapshot {
        let structure = self.subgraph().map(|subgraph| IdentitySnapshot::structure(subgraph));
        IdentitySnapshot {
            type_name: self.type_name.clone(),
            version: self.version,
            input_specs: self.inputs.specs(),
            output_specs: self.outputs.specs(),
            config_specs: self.config_specs.clone(),
            structure,
        }
    }
}
