// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory store backends. Ids are random UUIDv4 strings.

use crate::errors::StoreError;
use crate::graph::resource::{Resource, ResourceRef};
use crate::store::{Record, ResourceStore, Store, WriteBatch};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Record store backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Record>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Record>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    fn put(map: &mut HashMap<String, Record>, mut record: Record) -> String {
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                let id = new_id();
                record.set_id(id.clone());
                id
            }
        };
        map.insert(id.clone(), record);
        id
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save(&self, record: Record) -> Result<String, StoreError> {
        let mut map = self.write_lock();
        Ok(Self::put(&mut map, record))
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.read_lock().get(id).cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.read_lock().contains_key(id))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<Vec<String>, StoreError> {
        // Single write lock for the whole batch keeps the commit atomic.
        let mut map = self.write_lock();
        let ids = batch
            .into_records()
            .into_iter()
            .map(|record| Self::put(&mut map, record))
            .collect();
        Ok(ids)
    }
}

/// Resource store backed by a process-local map of payload snapshots.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    resources: RwLock<HashMap<String, Resource>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Resource> {
        self.resources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.resources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl ResourceStore for MemoryResourceStore {
    async fn save(&self, resource: &ResourceRef) -> Result<String, StoreError> {
        if let Some(id) = resource.saved_id() {
            return Ok(id);
        }
        let id = new_id();
        resource.mark_saved(id.clone());
        let snapshot = resource.snapshot();
        self.resources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), snapshot);
        Ok(id)
    }

    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .resources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConfigRecord, JobRecord};
    use std::collections::BTreeMap;

    fn config_record() -> Record {
        Record::Config(ConfigRecord {
            id: None,
            specs: BTreeMap::new(),
            params: BTreeMap::new(),
        })
    }

    #[tokio::test]
    async fn save_assigns_an_id_and_get_round_trips() {
        let store = MemoryStore::new();
        let id = store.save(config_record()).await.unwrap();

        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.id(), Some(id.as_str()));
        assert!(store.exists(&id).await.unwrap());
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn save_with_existing_id_updates_in_place() {
        let store = MemoryStore::new();
        let id = store.save(config_record()).await.unwrap();

        let updated = Record::Job(JobRecord {
            id: Some(id.clone()),
            process_ref: "p".to_string(),
            config_ref: "c".to_string(),
            is_running: true,
            is_finished: false,
            input_resource_ids: BTreeMap::new(),
        });
        let same_id = store.save(updated).await.unwrap();

        assert_eq!(same_id, id);
        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.get(&id).await.unwrap(),
            Some(Record::Job(_))
        ));
    }

    #[tokio::test]
    async fn commit_returns_ids_in_batch_order() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.push(config_record());
        batch.push(config_record());
        batch.push(config_record());

        let ids = store.commit(batch).await.unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(store.len(), 3);
        for id in &ids {
            assert!(store.exists(id).await.unwrap());
        }
    }

    #[tokio::test]
    async fn resource_save_is_idempotent() {
        let store = MemoryResourceStore::new();
        let resource = ResourceRef::new(Resource::new("text", serde_json::json!("hi")));

        let first = store.save(&resource).await.unwrap();
        let second = store.save(&resource).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert!(resource.is_saved());
        assert!(store.exists(&first).await.unwrap());
    }
}
