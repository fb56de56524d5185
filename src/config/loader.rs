// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::validation::validate_definition;
use crate::errors::{ConfigError, DefinitionError};
use crate::graph::port::PortAddr;
use crate::process::process::Process;
use crate::process::protocol::Subgraph;
use crate::process::registry::TaskRegistry;
use crate::validator::ParamValidator;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or building a protocol definition.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read protocol file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse protocol definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Everything validation found wrong with the definition, in check order.
    #[error("Protocol definition is invalid: {}", format_errors(.0))]
    Invalid(Vec<DefinitionError>),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn format_errors(errors: &[DefinitionError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A protocol as declared in a YAML file.
///
/// # Example
/// ```yaml
/// name: shout
/// processes:
///   - id: src
///     task: emit_text
///     params:
///       text: hello
///   - id: upper
///     task: uppercase
/// connectors:
///   - from: src.text
///     to: upper.text
/// outerfaces:
///   result: upper.result
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolDefinition {
    pub name: String,
    #[serde(default)]
    pub processes: Vec<ProcessEntry>,
    #[serde(default)]
    pub connectors: Vec<ConnectorEntry>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, PortAddr>,
    #[serde(default)]
    pub outerfaces: BTreeMap<String, PortAddr>,
}

/// One member process: an id unique within the protocol, a registered task
/// type, and explicitly set config params.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessEntry {
    pub id: String,
    pub task: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

/// One directed edge, both endpoints written as `process.port`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorEntry {
    pub from: PortAddr,
    pub to: PortAddr,
}

impl ProtocolDefinition {
    pub fn from_yaml(yaml: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validates the definition and builds the composite process, resolving
    /// task types through the registry and coercing params through the
    /// validator.
    pub fn build(
        &self,
        registry: &TaskRegistry,
        validator: &dyn ParamValidator,
    ) -> Result<Process, LoadError> {
        validate_definition(self, registry).map_err(LoadError::Invalid)?;

        let mut members = Vec::with_capacity(self.processes.len());
        for entry in &self.processes {
            let task =
                registry
                    .get(&entry.task)
                    .ok_or_else(|| DefinitionError::UnknownTaskType {
                        type_name: entry.task.clone(),
                    })?;
            let mut process = Process::leaf(&entry.id, task)?;
            for (name, raw) in &entry.params {
                process.set_param(name, raw.clone(), validator)?;
            }
            members.push(process);
        }

        let mut subgraph = Subgraph::new(members)?;
        for connector in &self.connectors {
            subgraph.connect(connector.from.clone(), connector.to.clone())?;
        }
        for (face, addr) in &self.interfaces {
            subgraph.expose_input(face, addr.clone())?;
        }
        for (face, addr) in &self.outerfaces {
            subgraph.expose_output(face, addr.clone())?;
        }

        Ok(Process::composite(&self.name, &self.name, subgraph)?)
    }
}

/// Loads a protocol definition from a YAML file.
pub fn load_protocol<P: AsRef<Path>>(path: P) -> Result<ProtocolDefinition, LoadError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| LoadError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    ProtocolDefinition::from_yaml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::builtin_registry;
    use crate::validator::JsonValidator;
    use std::io::Write;

    const SHOUT: &str = r#"
name: shout
processes:
  - id: src
    task: emit_text
    params:
      text: hello
  - id: upper
    task: uppercase
connectors:
  - from: src.text
    to: upper.text
outerfaces:
  result: upper.result
"#;

    #[test]
    fn parse_basic_definition() {
        let def = ProtocolDefinition::from_yaml(SHOUT).unwrap();
        assert_eq!(def.name, "shout");
        assert_eq!(def.processes.len(), 2);
        assert_eq!(def.connectors.len(), 1);
        assert_eq!(def.connectors[0].from.process, "src");
        assert_eq!(def.connectors[0].to.port, "text");
        assert_eq!(def.outerfaces["result"].process, "upper");
    }

    #[test]
    fn build_wires_the_composite() {
        let def = ProtocolDefinition::from_yaml(SHOUT).unwrap();
        let process = def.build(&builtin_registry(), &JsonValidator).unwrap();

        assert_eq!(process.name(), "shout");
        let subgraph = process.subgraph().expect("composite");
        assert_eq!(subgraph.processes().len(), 2);
        assert_eq!(subgraph.connectors().len(), 1);
        assert_eq!(
            subgraph
                .process("src")
                .and_then(|p| p.config())
                .and_then(|c| c.get_param("text").ok()),
            Some(serde_json::json!("hello"))
        );
        // The outerface becomes the composite's own output port.
        assert!(process.outputs().port("result").is_some());
    }

    #[test]
    fn unknown_task_type_is_rejected() {
        let yaml = r#"
name: broken
processes:
  - id: a
    task: does_not_exist
"#;
        let def = ProtocolDefinition::from_yaml(yaml).unwrap();
        let err = def.build(&builtin_registry(), &JsonValidator).unwrap_err();
        match err {
            LoadError::Invalid(errors) => {
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, DefinitionError::UnknownTaskType { .. })));
            }
            other => panic!("expected Invalid, got: {}", other),
        }
    }

    #[test]
    fn undeclared_param_is_rejected_at_build() {
        let yaml = r#"
name: broken
processes:
  - id: src
    task: emit_text
    params:
      not_a_param: 1
"#;
        let def = ProtocolDefinition::from_yaml(yaml).unwrap();
        let err = def.build(&builtin_registry(), &JsonValidator).unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
    }

    #[test]
    fn load_from_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shout.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SHOUT.as_bytes()).unwrap();

        let def = load_protocol(&path).unwrap();
        assert_eq!(def.name, "shout");

        let err = load_protocol(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::FileRead { .. }));
    }
}
