// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Protocol definitions loaded from YAML files.
//!
//! A definition names its member processes by registered task type, wires
//! them with connectors and optionally exposes interfaces and outerfaces.
//! Definitions are validated before building: duplicate ids, unknown task
//! types, dangling endpoint references and cyclic wiring are all rejected
//! with the full list of problems found.

pub mod loader;
pub mod validation;

pub use loader::{
    load_protocol, ConnectorEntry, LoadError, ProcessEntry, ProtocolDefinition,
};
pub use validation::validate_definition;
