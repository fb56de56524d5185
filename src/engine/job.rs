// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run provenance.
//!
//! A job records one run attempt of a persisted process: which process and
//! config definition ran, the ids of every input resource it consumed, and
//! whether the attempt finished. Output resources are linked back to the job
//! at save time, closing the provenance chain in both directions.

use crate::errors::RunError;
use crate::process::process::Process;
use crate::store::JobRecord;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Job {
    id: Option<String>,
    process_ref: String,
    config_ref: String,
    is_running: bool,
    is_finished: bool,
    input_resource_ids: BTreeMap<String, String>,
}

impl Job {
    /// Builds a job for a persisted process, capturing the ids of every
    /// resource currently held on its inputs. The process, its config and
    /// every held input must already be persisted; provenance cannot point
    /// at data that has no id.
    pub fn for_process(process: &Process) -> Result<Self, RunError> {
        let process_ref = process
            .id()
            .ok_or_else(|| RunError::UnpersistedProcess {
                process: process.name().to_string(),
            })?
            .to_string();
        let config_ref = process
            .config()
            .and_then(|c| c.id())
            .ok_or_else(|| RunError::UnpersistedConfig {
                process: process.name().to_string(),
            })?
            .to_string();

        let mut input_resource_ids = BTreeMap::new();
        for (port, resource) in process.inputs().resource_map() {
            match resource.saved_id() {
                Some(id) => {
                    input_resource_ids.insert(port, id);
                }
                None => {
                    return Err(RunError::UnpersistedInput {
                        process: process.name().to_string(),
                        port,
                    })
                }
            }
        }

        Ok(Self {
            id: None,
            process_ref,
            config_ref,
            is_running: false,
            is_finished: false,
            input_resource_ids,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn process_ref(&self) -> &str {
        &self.process_ref
    }

    pub fn config_ref(&self) -> &str {
        &self.config_ref
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn input_resource_ids(&self) -> &BTreeMap<String, String> {
        &self.input_resource_ids
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    pub(crate) fn start(&mut self) {
        self.is_running = true;
    }

    pub(crate) fn finish(&mut self) {
        self.is_running = false;
        self.is_finished = true;
    }

    /// Persistable snapshot of the job.
    pub fn record(&self) -> JobRecord {
        JobRecord {
            id: self.id.clone(),
            process_ref: self.process_ref.clone(),
            config_ref: self.config_ref.clone(),
            is_running: self.is_running,
            is_finished: self.is_finished,
            input_resource_ids: self.input_resource_ids.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::resource::{Resource, ResourceRef};
    use crate::process::testing::upper_process;
    use serde_json::json;

    fn persisted_process() -> Process {
        let mut process = upper_process("upper");
        process.config_mut();
        process.mark_saved("proc-1".to_string(), "hash-1".to_string());
        if let Some(config) = process.config() {
            assert!(!config.is_saved());
        }
        process.config_mut().mark_saved("cfg-1".to_string());
        process
    }

    #[test]
    fn captures_input_resource_ids() {
        let mut process = persisted_process();
        let resource = ResourceRef::new(Resource::new("text", json!("hi")));
        resource.mark_saved("res-1".to_string());
        process.set_input("text", resource).expect("input accepted");

        let job = Job::for_process(&process).expect("all prerequisites persisted");
        assert_eq!(job.process_ref(), "proc-1");
        assert_eq!(job.config_ref(), "cfg-1");
        assert_eq!(
            job.input_resource_ids().get("text").map(String::as_str),
            Some("res-1")
        );
    }

    #[test]
    fn unsaved_input_blocks_job_creation() {
        let mut process = persisted_process();
        process
            .set_input("text", ResourceRef::new(Resource::new("text", json!("x"))))
            .expect("type accepted even when unsaved");

        let err = Job::for_process(&process).unwrap_err();
        assert!(matches!(err, RunError::UnpersistedInput { .. }));
    }

    #[test]
    fn unpersisted_process_blocks_job_creation() {
        let process = upper_process("upper");
        let err = Job::for_process(&process).unwrap_err();
        assert!(matches!(err, RunError::UnpersistedProcess { .. }));
    }

    #[test]
    fn lifecycle_flags_round_trip_through_record() {
        let process = {
            let mut p = crate::process::testing::emit_process("src");
            p.config_mut().mark_saved("cfg-2".to_string());
            p.mark_saved("proc-2".to_string(), "hash-2".to_string());
            p
        };
        let mut job = Job::for_process(&process).expect("no inputs to capture");
        job.assign_id("job-1".to_string());
        job.start();
        assert!(job.record().is_running);

        job.finish();
        let record = job.record();
        assert!(record.is_finished);
        assert!(!record.is_running);
        assert_eq!(record.id.as_deref(), Some("job-1"));
    }
}
