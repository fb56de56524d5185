// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::RunError;
use crate::graph::resource::{ResourceRef, ResourceType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn default_required() -> bool {
    true
}

/// Declared shape of a single port: its name and the set of acceptable types.
///
/// Output ports additionally carry `required`: a task that finishes without
/// populating a required output fails the run. Optional outputs may stay
/// empty. Input ports ignore the flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub name: String,
    pub accepts: Vec<ResourceType>,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, accepts: Vec<ResourceType>) -> Self {
        Self {
            name: name.into(),
            accepts,
            required: true,
        }
    }

    /// A port accepting exactly one type.
    pub fn typed(name: impl Into<String>, r_type: impl Into<ResourceType>) -> Self {
        Self::new(name, vec![r_type.into()])
    }

    /// A port accepting any resource.
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, vec![ResourceType::any()])
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn accepts_type(&self, t: &ResourceType) -> bool {
        self.accepts.iter().any(|a| t.is_assignable_to(a))
    }
}

/// Address of a port: the owning process name plus the port name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PortAddr {
    pub process: String,
    pub port: String,
}

impl PortAddr {
    pub fn new(process: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            process: process.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.process, self.port)
    }
}

impl FromStr for PortAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((process, port)) if !process.is_empty() && !port.is_empty() => {
                Ok(Self::new(process, port))
            }
            _ => Err(format!("Invalid port address '{}': expected 'process.port'", s)),
        }
    }
}

impl TryFrom<String> for PortAddr {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PortAddr> for String {
    fn from(addr: PortAddr) -> Self {
        addr.to_string()
    }
}

/// Typed input socket. Fan-in arity is 1: at most one upstream connector.
#[derive(Debug, Clone)]
pub struct InputPort {
    spec: PortSpec,
    resource: Option<ResourceRef>,
    upstream: Option<PortAddr>,
}

impl InputPort {
    pub fn new(spec: PortSpec) -> Self {
        Self {
            spec,
            resource: None,
            upstream: None,
        }
    }

    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    pub fn upstream(&self) -> Option<&PortAddr> {
        self.upstream.as_ref()
    }

    /// Ready when a resource of an accepted type is held and persisted.
    pub fn is_ready(&self) -> bool {
        match &self.resource {
            Some(r) => self.spec.accepts_type(&r.r_type()) && r.is_saved(),
            None => false,
        }
    }

    /// Places a resource on the port, rejecting unacceptable types.
    pub fn set_resource(&mut self, owner: &str, resource: ResourceRef) -> Result<(), RunError> {
        let t = resource.r_type();
        if !self.spec.accepts_type(&t) {
            return Err(RunError::IncompatibleResource {
                process: owner.to_string(),
                port: self.spec.name.clone(),
                got: t.name().to_string(),
            });
        }
        self.resource = Some(resource);
        Ok(())
    }

    pub(crate) fn record_upstream(&mut self, from: PortAddr) {
        self.upstream = Some(from);
    }

    pub(crate) fn clear(&mut self) {
        self.resource = None;
    }
}

/// Typed output socket. Fan-out arity is N: any number of downstream targets.
#[derive(Debug, Clone)]
pub struct OutputPort {
    spec: PortSpec,
    resource: Option<ResourceRef>,
    targets: Vec<PortAddr>,
}

impl OutputPort {
    pub fn new(spec: PortSpec) -> Self {
        Self {
            spec,
            resource: None,
            targets: Vec::new(),
        }
    }

    pub fn spec(&self) -> &PortSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn resource(&self) -> Option<&ResourceRef> {
        self.resource.as_ref()
    }

    pub fn targets(&self) -> &[PortAddr] {
        &self.targets
    }

    pub fn is_ready(&self) -> bool {
        match &self.resource {
            Some(r) => self.spec.accepts_type(&r.r_type()) && r.is_saved(),
            None => false,
        }
    }

    pub fn set_resource(&mut self, owner: &str, resource: ResourceRef) -> Result<(), RunError> {
        let t = resource.r_type();
        if !self.spec.accepts_type(&t) {
            return Err(RunError::IncompatibleResource {
                process: owner.to_string(),
                port: self.spec.name.clone(),
                got: t.name().to_string(),
            });
        }
        self.resource = Some(resource);
        Ok(())
    }

    pub(crate) fn record_target(&mut self, to: PortAddr) {
        self.targets.push(to);
    }

    pub(crate) fn clear(&mut self) {
        self.resource = None;
    }
}
