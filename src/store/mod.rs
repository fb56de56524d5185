// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Abstract persistence contracts.
//!
//! The engine persists through two seams: a record [`Store`] for process,
//! config, job and progress records, and a [`ResourceStore`] that assigns
//! persisted ids to resources without the engine ever inspecting content.
//! Run-critical writes go through [`Store::commit`], an atomic multi-write:
//! either every record in the batch lands, or none does.

mod memory;

pub use memory::{MemoryResourceStore, MemoryStore};

use crate::errors::StoreError;
use crate::graph::connector::Connector;
use crate::graph::port::{PortAddr, PortSpec};
use crate::graph::resource::ResourceRef;
use crate::process::config::ConfigSpecs;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Persisted shape of a composite process's body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtocolShape {
    pub processes: BTreeMap<String, String>,
    pub connectors: Vec<Connector>,
    pub interfaces: BTreeMap<String, PortAddr>,
    pub outerfaces: BTreeMap<String, PortAddr>,
}

/// Persisted shape of a process definition and its lifecycle flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessRecord {
    pub id: Option<String>,
    pub name: String,
    pub type_name: String,
    pub hash: String,
    pub is_running: bool,
    pub is_finished: bool,
    pub input_specs: Vec<PortSpec>,
    pub output_specs: Vec<PortSpec>,
    pub config_specs: ConfigSpecs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ProtocolShape>,
}

/// Persisted config: declared specs plus the explicitly set params.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigRecord {
    pub id: Option<String>,
    pub specs: ConfigSpecs,
    pub params: BTreeMap<String, Value>,
}

/// Persisted run record with captured input provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: Option<String>,
    pub process_ref: String,
    pub config_ref: String,
    pub is_running: bool,
    pub is_finished: bool,
    pub input_resource_ids: BTreeMap<String, String>,
}

/// Persisted progress stream of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: Option<String>,
    pub process_ref: String,
    pub messages: Vec<crate::engine::progress::ProgressMessage>,
}

/// One persistable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Process(ProcessRecord),
    Config(ConfigRecord),
    Job(JobRecord),
    Progress(ProgressRecord),
}

impl Record {
    pub fn id(&self) -> Option<&str> {
        match self {
            Record::Process(r) => r.id.as_deref(),
            Record::Config(r) => r.id.as_deref(),
            Record::Job(r) => r.id.as_deref(),
            Record::Progress(r) => r.id.as_deref(),
        }
    }

    pub(crate) fn set_id(&mut self, id: String) {
        match self {
            Record::Process(r) => r.id = Some(id),
            Record::Config(r) => r.id = Some(id),
            Record::Job(r) => r.id = Some(id),
            Record::Progress(r) => r.id = Some(id),
        }
    }
}

/// Ordered set of records persisted atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    records: Vec<Record>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Record persistence collaborator.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists one record, assigning an id when the record has none.
    /// Saving a record that carries an id updates the stored copy.
    async fn save(&self, record: Record) -> Result<String, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Record>, StoreError>;

    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Persists every record in the batch atomically, returning the ids in
    /// batch order. On any failure nothing is persisted.
    async fn commit(&self, batch: WriteBatch) -> Result<Vec<String>, StoreError>;
}

/// Resource persistence collaborator. The engine only needs ids to exist;
/// content stays opaque.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Persists the resource and marks the handle with its assigned id.
    /// Saving an already-saved resource is a no-op returning the same id.
    async fn save(&self, resource: &ResourceRef) -> Result<String, StoreError>;

    async fn exists(&self, id: &str) -> Result<bool, StoreError>;
}
