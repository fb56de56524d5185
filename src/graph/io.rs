// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named port containers owned by a process.
//!
//! `Inputs` and `Outputs` are created once from declared specs; their shape is
//! frozen afterwards (the owning process rejects port additions once it has
//! started). Write windows — inputs locked while running, outputs locked after
//! finishing — are enforced by the owning process, which is the only holder of
//! the lifecycle flags.

use crate::errors::{DefinitionError, RunError};
use crate::graph::port::{InputPort, OutputPort, PortSpec};
use crate::graph::resource::ResourceRef;
use std::collections::BTreeMap;

/// Named map of input ports.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    ports: BTreeMap<String, InputPort>,
}

impl Inputs {
    pub fn from_specs(specs: &[PortSpec]) -> Result<Self, DefinitionError> {
        let mut ports = BTreeMap::new();
        for spec in specs {
            if ports.contains_key(&spec.name) {
                return Err(DefinitionError::DuplicatePort {
                    port: spec.name.clone(),
                });
            }
            ports.insert(spec.name.clone(), InputPort::new(spec.clone()));
        }
        Ok(Self { ports })
    }

    pub fn add_port(&mut self, spec: PortSpec) -> Result<(), DefinitionError> {
        if self.ports.contains_key(&spec.name) {
            return Err(DefinitionError::DuplicatePort { port: spec.name });
        }
        self.ports.insert(spec.name.clone(), InputPort::new(spec));
        Ok(())
    }

    pub fn port(&self, name: &str) -> Option<&InputPort> {
        self.ports.get(name)
    }

    pub(crate) fn port_mut(&mut self, name: &str) -> Option<&mut InputPort> {
        self.ports.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.ports.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &InputPort)> {
        self.ports.iter()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// True when every declared input holds a persisted, type-accepted resource.
    pub fn all_ready(&self) -> bool {
        self.ports.values().all(|p| p.is_ready())
    }

    pub fn set_resource(
        &mut self,
        owner: &str,
        name: &str,
        resource: ResourceRef,
    ) -> Result<(), RunError> {
        match self.ports.get_mut(name) {
            Some(port) => port.set_resource(owner, resource),
            None => Err(RunError::UnknownPort {
                process: owner.to_string(),
                port: name.to_string(),
            }),
        }
    }

    /// Snapshot of held resources, keyed by port name. Unset ports are absent.
    pub fn resource_map(&self) -> BTreeMap<String, ResourceRef> {
        self.ports
            .iter()
            .filter_map(|(name, port)| port.resource().map(|r| (name.clone(), r.clone())))
            .collect()
    }

    pub fn specs(&self) -> Vec<PortSpec> {
        self.ports.values().map(|p| p.spec().clone()).collect()
    }

    pub(crate) fn clear_resources(&mut self) {
        for port in self.ports.values_mut() {
            port.clear();
        }
    }
}

/// Named map of output ports.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    ports: BTreeMap<String, OutputPort>,
}

impl Outputs {
    pub fn from_specs(specs: &[PortSpec]) -> Result<Self, DefinitionError> {
        let mut ports = BTreeMap::new();
        for spec in specs {
            if ports.contains_key(&spec.name) {
                return Err(DefinitionError::DuplicatePort {
                    port: spec.name.clone(),
                });
            }
            ports.insert(spec.name.clone(), OutputPort::new(spec.clone()));
        }
        Ok(Self { ports })
    }

    pub fn add_port(&mut self, spec: PortSpec) -> Result<(), DefinitionError> {
        if self.ports.contains_key(&spec.name) {
            return Err(DefinitionError::DuplicatePort { port: spec.name });
        }
        self.ports.insert(spec.name.clone(), OutputPort::new(spec));
        Ok(())
    }

    pub fn port(&self, name: &str) -> Option<&OutputPort> {
        self.ports.get(name)
    }

    pub(crate) fn port_mut(&mut self, name: &str) -> Option<&mut OutputPort> {
        self.ports.get_mut(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.ports.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OutputPort)> {
        self.ports.iter()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn set_resource(
        &mut self,
        owner: &str,
        name: &str,
        resource: ResourceRef,
    ) -> Result<(), RunError> {
        match self.ports.get_mut(name) {
            Some(port) => port.set_resource(owner, resource),
            None => Err(RunError::UnknownPort {
                process: owner.to_string(),
                port: name.to_string(),
            }),
        }
    }

    /// Names of required output ports left unpopulated.
    pub fn missing_required(&self) -> Vec<String> {
        self.ports
            .values()
            .filter(|p| p.spec().required && p.resource().is_none())
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Distinct downstream process names reachable through these ports,
    /// in first-seen order. Used by the scheduler to know what to wake.
    pub fn next_processes(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for port in self.ports.values() {
            for target in port.targets() {
                if !seen.contains(&target.process) {
                    seen.push(target.process.clone());
                }
            }
        }
        seen
    }

    pub fn resource_map(&self) -> BTreeMap<String, ResourceRef> {
        self.ports
            .iter()
            .filter_map(|(name, port)| port.resource().map(|r| (name.clone(), r.clone())))
            .collect()
    }

    pub fn specs(&self) -> Vec<PortSpec> {
        self.ports.values().map(|p| p.spec().clone()).collect()
    }

    pub(crate) fn clear_resources(&mut self) {
        for port in self.ports.values_mut() {
            port.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::port::PortAddr;
    use crate::graph::resource::Resource;
    use serde_json::json;

    #[test]
    fn duplicate_port_names_are_rejected() {
        let specs = vec![PortSpec::typed("a", "text"), PortSpec::typed("a", "text")];
        let err = Inputs::from_specs(&specs).unwrap_err();
        assert_eq!(err, DefinitionError::DuplicatePort { port: "a".into() });
    }

    #[test]
    fn all_ready_holds_only_when_every_port_is_fed() {
        let mut inputs = Inputs::from_specs(&[
            PortSpec::typed("left", "text"),
            PortSpec::typed("right", "text"),
        ])
        .expect("valid specs");

        assert!(!inputs.all_ready());

        let left = ResourceRef::new(Resource::new("text", json!("l")));
        left.mark_saved("res-l".to_string());
        inputs.set_resource("sink", "left", left).expect("set left");
        assert!(!inputs.all_ready());

        let right = ResourceRef::new(Resource::new("text", json!("r")));
        right.mark_saved("res-r".to_string());
        inputs.set_resource("sink", "right", right).expect("set right");
        assert!(inputs.all_ready());
    }

    #[test]
    fn no_inputs_is_trivially_ready() {
        let inputs = Inputs::from_specs(&[]).expect("empty specs");
        assert!(inputs.all_ready());
    }

    #[test]
    fn next_processes_are_distinct_and_ordered() {
        let mut outputs = Outputs::from_specs(&[
            PortSpec::typed("a", "text"),
            PortSpec::typed("b", "text"),
        ])
        .expect("valid specs");

        outputs
            .port_mut("a")
            .map(|p| p.record_target(PortAddr::new("x", "in")));
        outputs
            .port_mut("a")
            .map(|p| p.record_target(PortAddr::new("y", "in")));
        outputs
            .port_mut("b")
            .map(|p| p.record_target(PortAddr::new("x", "other")));

        assert_eq!(outputs.next_processes(), vec!["x", "y"]);
    }

    #[test]
    fn missing_required_skips_optional_outputs() {
        let outputs = Outputs::from_specs(&[
            PortSpec::typed("main", "text"),
            PortSpec::typed("debug", "text").optional(),
        ])
        .expect("valid specs");

        assert_eq!(outputs.missing_required(), vec!["main".to_string()]);
    }
}
