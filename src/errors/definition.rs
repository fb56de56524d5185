// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::port::PortAddr;
use std::fmt;

/// Errors that can occur while defining a process or protocol structure.
///
/// These are construction-time failures: once a protocol builds successfully,
/// none of these can occur during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// Two child processes were registered under the same name
    DuplicateProcess {
        name: String,
    },
    /// A connector, interface or outerface references a process that is not a member
    UnknownProcess {
        name: String,
    },
    /// A connector, interface or outerface references a port that does not exist
    UnknownPort {
        addr: PortAddr,
    },
    /// A connector joins two ports of the same process
    SelfConnection {
        process: String,
    },
    /// The target input port already has an upstream connector
    AlreadyConnected {
        to: PortAddr,
        existing: PortAddr,
    },
    /// The exact same connector was added twice
    DuplicateConnector {
        from: PortAddr,
        to: PortAddr,
    },
    /// The source port can emit a type the target port does not accept
    IncompatibleConnector {
        from: PortAddr,
        to: PortAddr,
        offending_type: String,
    },
    /// Two ports of the same IO container share a name
    DuplicatePort {
        port: String,
    },
    /// A port was added after the owning process started or finished
    ShapeFrozen {
        process: String,
    },
    /// An interface or outerface name was declared twice
    DuplicateFace {
        name: String,
    },
    /// The connector graph contains a cycle
    CyclicWiring {
        cycle: Vec<String>,
    },
    /// A definition references a task type missing from the registry
    UnknownTaskType {
        type_name: String,
    },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionError::DuplicateProcess { name } => {
                write!(f, "Duplicate process name: '{}'", name)
            }
            DefinitionError::UnknownProcess { name } => {
                write!(f, "Process '{}' is not a member of this protocol", name)
            }
            DefinitionError::UnknownPort { addr } => {
                write!(f, "Port '{}' does not exist", addr)
            }
            DefinitionError::SelfConnection { process } => {
                write!(f, "Process '{}' cannot be connected to itself", process)
            }
            DefinitionError::AlreadyConnected { to, existing } => {
                write!(
                    f,
                    "Input port '{}' is already fed by '{}'; input ports accept a single upstream connector",
                    to, existing
                )
            }
            DefinitionError::DuplicateConnector { from, to } => {
                write!(f, "Connector '{}' -> '{}' was added twice", from, to)
            }
            DefinitionError::IncompatibleConnector {
                from,
                to,
                offending_type,
            } => {
                write!(
                    f,
                    "Connector '{}' -> '{}' is not type-compatible: '{}' is not accepted by the target",
                    from, to, offending_type
                )
            }
            DefinitionError::DuplicatePort { port } => {
                write!(f, "Duplicate port name: '{}'", port)
            }
            DefinitionError::ShapeFrozen { process } => {
                write!(
                    f,
                    "Ports of process '{}' cannot change once it has started",
                    process
                )
            }
            DefinitionError::DuplicateFace { name } => {
                write!(f, "Interface/outerface '{}' was declared twice", name)
            }
            DefinitionError::CyclicWiring { cycle } => {
                write!(f, "Cyclic wiring detected: {}", cycle.join(" -> "))
            }
            DefinitionError::UnknownTaskType { type_name } => {
                write!(f, "Task type '{}' is not registered", type_name)
            }
        }
    }
}

impl std::error::Error for DefinitionError {}
