// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Content-hash identity for process definitions.
//!
//! A process's identity is the pair (declared type, content hash). The hash
//! covers the serialized structural definition — port specs, config specs,
//! version and, for composites, the recursive child structure — never source
//! text, so comment-only edits cannot flip identities. A stored record whose
//! hash no longer matches the live definition is stale and must not run.

use crate::errors::RunError;
use crate::graph::port::PortSpec;
use crate::process::config::ConfigSpecs;
use crate::process::protocol::Subgraph;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Serialized structural definition of a process, the input to the hash.
///
/// All maps are ordered, so serialization is deterministic and re-deriving
/// the hash of an unchanged definition is stable across calls.
#[derive(Debug, Clone, Serialize)]
pub struct IdentitySnapshot {
    pub type_name: String,
    pub version: u32,
    pub input_specs: Vec<PortSpec>,
    pub output_specs: Vec<PortSpec>,
    pub config_specs: ConfigSpecs,
    /// Composite shape: recursive child snapshots plus wiring. `None` for leaves.
    pub structure: Option<Value>,
}

impl IdentitySnapshot {
    pub(crate) fn structure(subgraph: &Subgraph) -> Value {
        let children: Value = subgraph
            .processes()
            .iter()
            .map(|(name, child)| {
                let snapshot = child.identity_snapshot();
                (
                    name.clone(),
                    serde_json::to_value(&snapshot).unwrap_or(Value::Null),
                )
            })
            .collect::<serde_json::Map<String, Value>>()
            .into();

        json!({
            "children": children,
            "connectors": serde_json::to_value(subgraph.connectors()).unwrap_or(Value::Null),
            "interfaces": serde_json::to_value(subgraph.interfaces()).unwrap_or(Value::Null),
            "outerfaces": serde_json::to_value(subgraph.outerfaces()).unwrap_or(Value::Null),
        })
    }
}

/// Identity collaborator: turns a structural snapshot into a stable hash.
pub trait ProcessHasher: Send + Sync {
    fn hash(&self, snapshot: &IdentitySnapshot) -> Result<String, RunError>;
}

/// Default hasher: SHA-256 over the canonical JSON of the snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralHasher;

impl ProcessHasher for StructuralHasher {
    fn hash(&self, snapshot: &IdentitySnapshot) -> Result<String, RunError> {
        let bytes =
            serde_json::to_vec(snapshot).map_err(|e| RunError::Identity(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::{upper_process, UpperTask, VersionedUpperTask};
    use crate::process::Process;
    use std::sync::Arc;

    #[test]
    fn hash_is_stable_across_calls() {
        let process = upper_process("upper");
        let hasher = StructuralHasher;

        let first = hasher.hash(&process.identity_snapshot()).expect("hash");
        let second = hasher.hash(&process.identity_snapshot()).expect("hash");
        assert_eq!(first, second);
    }

    #[test]
    fn equivalent_definitions_share_a_hash() {
        let a = upper_process("a");
        let b = upper_process("b");
        let hasher = StructuralHasher;

        // The process name is not part of identity; the definition is.
        assert_eq!(
            hasher.hash(&a.identity_snapshot()).expect("hash"),
            hasher.hash(&b.identity_snapshot()).expect("hash"),
        );
    }

    #[test]
    fn changed_implementation_changes_the_hash() {
        let v1 = Process::leaf("upper", Arc::new(UpperTask)).expect("leaf");
        let v2 =
            Process::leaf("upper", Arc::new(VersionedUpperTask { version: 2 })).expect("leaf");
        let hasher = StructuralHasher;

        assert_ne!(
            hasher.hash(&v1.identity_snapshot()).expect("hash"),
            hasher.hash(&v2.identity_snapshot()).expect("hash"),
        );
    }
}
