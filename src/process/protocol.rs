// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Protocol composition: a sub-graph of processes wired by connectors.
//!
//! Every structural invariant is checked at registration time — endpoints
//! must be members, inputs accept a single upstream edge, connectors must be
//! type-compatible, interfaces and outerfaces must resolve to existing child
//! ports. A subgraph that builds successfully cannot fail structurally during
//! a run.

use crate::errors::DefinitionError;
use crate::graph::connector::{incompatible_type, Connector};
use crate::graph::port::{PortAddr, PortSpec};
use crate::process::process::Process;
use std::collections::BTreeMap;

/// The composite body of a protocol: named children, connectors, and the
/// subset of child ports exposed as the protocol's own interfaces (inputs)
/// and outerfaces (outputs).
#[derive(Debug, Default)]
pub struct Subgraph {
    processes: BTreeMap<String, Process>,
    connectors: Vec<Connector>,
    interfaces: BTreeMap<String, PortAddr>,
    outerfaces: BTreeMap<String, PortAddr>,
}

impl Subgraph {
    pub fn new(processes: Vec<Process>) -> Result<Self, DefinitionError> {
        let mut map = BTreeMap::new();
        for process in processes {
            let name = process.name().to_string();
            if map.insert(name.clone(), process).is_some() {
                return Err(DefinitionError::DuplicateProcess { name });
            }
        }
        Ok(Self {
            processes: map,
            connectors: Vec::new(),
            interfaces: BTreeMap::new(),
            outerfaces: BTreeMap::new(),
        })
    }

    pub fn processes(&self) -> &BTreeMap<String, Process> {
        &self.processes
    }

    pub fn process(&self, name: &str) -> Option<&Process> {
        self.processes.get(name)
    }

    pub(crate) fn process_mut(&mut self, name: &str) -> Option<&mut Process> {
        self.processes.get_mut(name)
    }

    pub(crate) fn take_process(&mut self, name: &str) -> Option<Process> {
        self.processes.remove(name)
    }

    pub(crate) fn put_process(&mut self, process: Process) {
        self.processes.insert(process.name().to_string(), process);
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn interfaces(&self) -> &BTreeMap<String, PortAddr> {
        &self.interfaces
    }

    pub fn outerfaces(&self) -> &BTreeMap<String, PortAddr> {
        &self.outerfaces
    }

    /// Registers a directed edge. Checks, in order: membership of both
    /// endpoints, no self-connection, port existence, type compatibility,
    /// single upstream per input, no duplicate edge. On success the edge is
    /// recorded symmetrically on both ports.
    pub fn connect(&mut self, from: PortAddr, to: PortAddr) -> Result<(), DefinitionError> {
        if !self.processes.contains_key(&from.process) {
            return Err(DefinitionError::UnknownProcess {
                name: from.process.clone(),
            });
        }
        if !self.processes.contains_key(&to.process) {
            return Err(DefinitionError::UnknownProcess {
                name: to.process.clone(),
            });
        }
        if from.process == to.process {
            return Err(DefinitionError::SelfConnection {
                process: from.process.clone(),
            });
        }

        let from_spec = self
            .processes
            .get(&from.process)
            .and_then(|p| p.outputs().port(&from.port))
            .map(|p| p.spec().clone())
            .ok_or_else(|| DefinitionError::UnknownPort { addr: from.clone() })?;
        let to_port = self
            .processes
            .get(&to.process)
            .and_then(|p| p.inputs().port(&to.port))
            .ok_or_else(|| DefinitionError::UnknownPort { addr: to.clone() })?;

        if let Some(offending_type) = incompatible_type(&from_spec, to_port.spec()) {
            return Err(DefinitionError::IncompatibleConnector {
                from,
                to,
                offending_type,
            });
        }
        if let Some(existing) = to_port.upstream() {
            return Err(DefinitionError::AlreadyConnected {
                to,
                existing: existing.clone(),
            });
        }

        let connector = Connector::new(from.clone(), to.clone());
        if self.connectors.contains(&connector) {
            return Err(DefinitionError::DuplicateConnector { from, to });
        }

        if let Some(p) = self.processes.get_mut(&from.process) {
            if let Some(port) = p.outputs_mut().port_mut(&from.port) {
                port.record_target(to.clone());
            }
        }
        if let Some(p) = self.processes.get_mut(&to.process) {
            if let Some(port) = p.inputs_mut().port_mut(&to.port) {
                port.record_upstream(from);
            }
        }
        self.connectors.push(connector);
        Ok(())
    }

    /// Declares a protocol-level input bound to a child's input port.
    /// The target must exist and must not already have an upstream connector.
    pub fn expose_input(
        &mut self,
        name: impl Into<String>,
        addr: PortAddr,
    ) -> Result<(), DefinitionError> {
        let name = name.into();
        if self.interfaces.contains_key(&name) {
            return Err(DefinitionError::DuplicateFace { name });
        }
        let port = self
            .processes
            .get(&addr.process)
            .ok_or_else(|| DefinitionError::UnknownProcess {
                name: addr.process.clone(),
            })?
            .inputs()
            .port(&addr.port)
            .ok_or_else(|| DefinitionError::UnknownPort { addr: addr.clone() })?;
        if let Some(existing) = port.upstream() {
            return Err(DefinitionError::AlreadyConnected {
                to: addr,
                existing: existing.clone(),
            });
        }
        self.interfaces.insert(name, addr);
        Ok(())
    }

    /// Declares a protocol-level output derived from a child's output port.
    pub fn expose_output(
        &mut self,
        name: impl Into<String>,
        addr: PortAddr,
    ) -> Result<(), DefinitionError> {
        let name = name.into();
        if self.outerfaces.contains_key(&name) {
            return Err(DefinitionError::DuplicateFace { name });
        }
        self.processes
            .get(&addr.process)
            .ok_or_else(|| DefinitionError::UnknownProcess {
                name: addr.process.clone(),
            })?
            .outputs()
            .port(&addr.port)
            .ok_or_else(|| DefinitionError::UnknownPort { addr: addr.clone() })?;
        self.outerfaces.insert(name, addr);
        Ok(())
    }

    /// Port spec backing an interface, renamed to the protocol-level name.
    pub(crate) fn interface_specs(&self) -> Vec<PortSpec> {
        self.face_specs(&self.interfaces, true)
    }

    /// Port spec backing an outerface, renamed to the protocol-level name.
    pub(crate) fn outerface_specs(&self) -> Vec<PortSpec> {
        self.face_specs(&self.outerfaces, false)
    }

    fn face_specs(&self, faces: &BTreeMap<String, PortAddr>, input: bool) -> Vec<PortSpec> {
        faces
            .iter()
            .filter_map(|(name, addr)| {
                let process = self.processes.get(&addr.process)?;
                let spec = if input {
                    process.inputs().port(&addr.port)?.spec().clone()
                } else {
                    process.outputs().port(&addr.port)?.spec().clone()
                };
                Some(PortSpec {
                    name: name.clone(),
                    ..spec
                })
            })
            .collect()
    }

    /// Connectors leaving the named child.
    pub fn connectors_from(&self, name: &str) -> Vec<&Connector> {
        self.connectors
            .iter()
            .filter(|c| c.from.process == name)
            .collect()
    }

    /// Processes whose runs the protocol waits for: outerface targets, or
    /// every child when no outerface is declared.
    pub fn sink_names(&self) -> Vec<String> {
        if self.outerfaces.is_empty() {
            return self.processes.keys().cloned().collect();
        }
        let mut seen = Vec::new();
        for addr in self.outerfaces.values() {
            if !seen.contains(&addr.process) {
                seen.push(addr.process.clone());
            }
        }
        seen
    }

    /// Names of children targeted by at least one interface.
    pub fn interface_targets(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for addr in self.interfaces.values() {
            if !seen.contains(&addr.process) {
                seen.push(addr.process.clone());
            }
        }
        seen
    }

    /// Child type names, for the persisted protocol shape.
    pub fn child_types(&self) -> BTreeMap<String, String> {
        self.processes
            .iter()
            .map(|(name, p)| (name.clone(), p.type_name().to_string()))
            .collect()
    }
}
