// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Wildcard type name accepted by ports that take any resource.
pub const ANY_TYPE: &str = "any";

/// Declared type of a resource, interned as a plain name.
///
/// Assignability is nominal: a type is assignable to itself and to the
/// [`ANY_TYPE`] wildcard. Stored definitions resolve type names through the
/// task registry rather than any global lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn any() -> Self {
        Self(ANY_TYPE.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_assignable_to(&self, target: &ResourceType) -> bool {
        target.0 == ANY_TYPE || self.0 == target.0
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A produced-once data handle exchanged between processes.
///
/// The engine never inspects the payload; it only cares about the declared
/// type and the persisted id. A resource gains its id when saved through the
/// resource store, and is optionally linked back to the job that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    r_type: ResourceType,
    payload: serde_json::Value,
    id: Option<String>,
    job_id: Option<String>,
}

impl Resource {
    pub fn new(r_type: impl Into<ResourceType>, payload: serde_json::Value) -> Self {
        Self {
            r_type: r_type.into(),
            payload,
            id: None,
            job_id: None,
        }
    }

    pub fn r_type(&self) -> &ResourceType {
        &self.r_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

impl From<ResourceType> for String {
    fn from(t: ResourceType) -> Self {
        t.0
    }
}

/// Shared handle to a [`Resource`].
///
/// Propagation across connectors copies this handle, never the data: every
/// consumer of a propagated resource observes the same underlying instance.
/// Consumers must not mutate a propagated resource; producers create fresh
/// resources for their outputs.
#[derive(Debug, Clone)]
pub struct ResourceRef(Arc<RwLock<Resource>>);

impl ResourceRef {
    pub fn new(resource: Resource) -> Self {
        Self(Arc::new(RwLock::new(resource)))
    }

    /// True when both handles point at the same underlying resource.
    pub fn same_identity(a: &ResourceRef, b: &ResourceRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn r_type(&self) -> ResourceType {
        self.read().r_type.clone()
    }

    pub fn payload(&self) -> serde_json::Value {
        self.read().payload.clone()
    }

    pub fn saved_id(&self) -> Option<String> {
        self.read().id.clone()
    }

    pub fn job_id(&self) -> Option<String> {
        self.read().job_id.clone()
    }

    pub fn is_saved(&self) -> bool {
        self.read().id.is_some()
    }

    /// Records the persisted id. Called by the resource store on save.
    pub fn mark_saved(&self, id: String) {
        self.write().id = Some(id);
    }

    /// Links the resource to the job that produced it.
    pub fn link_job(&self, job_id: String) {
        self.write().job_id = Some(job_id);
    }

    /// Owned copy of the current resource state.
    pub fn snapshot(&self) -> Resource {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Resource> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Resource> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl From<Resource> for ResourceRef {
    fn from(resource: Resource) -> Self {
        Self::new(resource)
    }
}
