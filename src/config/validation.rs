// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of protocol definitions.
//!
//! The pipeline runs three stages in order:
//!
//! 1. **Uniqueness**: member process ids must be unique
//! 2. **References**: task types must be registered, and every connector,
//!    interface and outerface endpoint must name a member process
//! 3. **Cycle detection**: the connector graph must be acyclic
//!
//! The ordering matters: cycle detection walks the connector graph, so the
//! references it follows must resolve first. All problems found are returned
//! together rather than stopping at the first.
//!
//! Cycle detection is depth-first search with a recursion stack, O(V + E),
//! and reports the actual cycle path.

use crate::config::loader::ProtocolDefinition;
use crate::errors::DefinitionError;
use crate::process::registry::TaskRegistry;
use std::collections::{HashMap, HashSet};

/// Validates a protocol definition against the task registry.
///
/// Returns every problem found, in pipeline order. Cycle detection only runs
/// when the earlier stages pass, since it needs a resolvable graph.
pub fn validate_definition(
    definition: &ProtocolDefinition,
    registry: &TaskRegistry,
) -> Result<(), Vec<DefinitionError>> {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    for entry in &definition.processes {
        if !ids.insert(entry.id.as_str()) {
            errors.push(DefinitionError::DuplicateProcess {
                name: entry.id.clone(),
            });
        }
        if !registry.contains(&entry.task) {
            errors.push(DefinitionError::UnknownTaskType {
                type_name: entry.task.clone(),
            });
        }
    }

    for connector in &definition.connectors {
        for endpoint in [&connector.from, &connector.to] {
            if !ids.contains(endpoint.process.as_str()) {
                errors.push(DefinitionError::UnknownProcess {
                    name: endpoint.process.clone(),
                });
            }
        }
    }
    for addr in definition
        .interfaces
        .values()
        .chain(definition.outerfaces.values())
    {
        if !ids.contains(addr.process.as_str()) {
            errors.push(DefinitionError::UnknownProcess {
                name: addr.process.clone(),
            });
        }
    }

    if errors.is_empty() {
        if let Some(cycle) = find_cycle(definition) {
            errors.push(DefinitionError::CyclicWiring { cycle });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// DFS over the connector graph. Returns the first cycle found as the path of
/// process ids, closed with a repeat of the entry node.
fn find_cycle(definition: &ProtocolDefinition) -> Option<Vec<String>> {
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
    for connector in &definition.connectors {
        edges
            .entry(connector.from.process.as_str())
            .or_default()
            .push(connector.to.process.as_str());
    }

    let mut states: HashMap<&str, VisitState> = definition
        .processes
        .iter()
        .map(|entry| (entry.id.as_str(), VisitState::Unvisited))
        .collect();
    let mut path: Vec<&str> = Vec::new();

    for entry in &definition.processes {
        if states.get(entry.id.as_str()) == Some(&VisitState::Unvisited) {
            if let Some(cycle) = visit(entry.id.as_str(), &edges, &mut states, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    states: &mut HashMap<&'a str, VisitState>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    states.insert(node, VisitState::InProgress);
    path.push(node);

    for &next in edges.get(node).map(Vec::as_slice).unwrap_or_default() {
        match states.get(next) {
            Some(VisitState::InProgress) => {
                // Close the loop from where `next` entered the path.
                let start = path.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }
            Some(VisitState::Unvisited) => {
                if let Some(cycle) = visit(next, edges, states, path) {
                    return Some(cycle);
                }
            }
            _ => {}
        }
    }

    path.pop();
    states.insert(node, VisitState::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::ProtocolDefinition;
    use crate::tasks::builtin_registry;

    fn definition(yaml: &str) -> ProtocolDefinition {
        ProtocolDefinition::from_yaml(yaml).expect("valid yaml")
    }

    #[test]
    fn valid_definition_passes() {
        let def = definition(
            r#"
name: ok
processes:
  - id: src
    task: emit_text
  - id: upper
    task: uppercase
connectors:
  - from: src.text
    to: upper.text
"#,
        );
        assert!(validate_definition(&def, &builtin_registry()).is_ok());
    }

    #[test]
    fn duplicate_ids_are_reported() {
        let def = definition(
            r#"
name: dup
processes:
  - id: a
    task: emit_text
  - id: a
    task: uppercase
"#,
        );
        let errors = validate_definition(&def, &builtin_registry()).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, DefinitionError::DuplicateProcess { name } if name == "a")));
    }

    #[test]
    fn dangling_endpoints_are_reported() {
        let def = definition(
            r#"
name: dangling
processes:
  - id: src
    task: emit_text
connectors:
  - from: src.text
    to: ghost.text
outerfaces:
  out: phantom.result
"#,
        );
        let errors = validate_definition(&def, &builtin_registry()).unwrap_err();
        let unknown: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                DefinitionError::UnknownProcess { name } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(unknown, vec!["ghost", "phantom"]);
    }

    #[test]
    fn cycle_is_reported_with_its_path() {
        let def = definition(
            r#"
name: cyclic
processes:
  - id: a
    task: uppercase
  - id: b
    task: reverse
connectors:
  - from: a.result
    to: b.text
  - from: b.result
    to: a.text
"#,
        );
        let errors = validate_definition(&def, &builtin_registry()).unwrap_err();
        match &errors[0] {
            DefinitionError::CyclicWiring { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert!(cycle.contains(&"a".to_string()));
                assert!(cycle.contains(&"b".to_string()));
            }
            other => panic!("expected CyclicWiring, got: {}", other),
        }
    }

    #[test]
    fn multiple_problems_are_reported_together() {
        let def = definition(
            r#"
name: broken
processes:
  - id: a
    task: emit_text
  - id: a
    task: not_registered
"#,
        );
        let errors = validate_definition(&def, &builtin_registry()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
