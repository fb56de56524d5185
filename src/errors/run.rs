// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while configuring or executing processes.
//!
//! Construction-time structural problems live in [`DefinitionError`]; everything
//! that can go wrong once a definition exists — state violations, identity
//! mismatches, provenance gaps, task failures — lands here. All variants
//! implement `std::error::Error` via the `thiserror` crate.

use crate::errors::DefinitionError;
use crate::process::config::ParamKind;
use thiserror::Error;

/// A task-level failure produced by a `ProcessTask` implementation.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by config spec/param handling.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The parameter name is not declared in the config specs.
    #[error("Parameter '{name}' is not declared")]
    UndeclaredParam { name: String },

    /// The raw value could not be coerced to the declared parameter kind.
    #[error("Parameter '{name}' expects a {expected:?} value, got: {got}")]
    InvalidParamValue {
        name: String,
        expected: ParamKind,
        got: String,
    },

    /// Config specs cannot be redefined once the config has been persisted.
    #[error("Config specs are frozen once persisted")]
    SpecsFrozen,
}

/// Errors raised by the persistence and resource-store collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record exists under the given id.
    #[error("No record with id '{0}'")]
    NotFound(String),

    /// A record could not be (de)serialized.
    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store rejected the operation; the whole batch rolled back.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors raised while running a process, protocol, job or queue.
#[derive(Error, Debug)]
pub enum RunError {
    /// `run()` was called on a process whose inputs are not all ready.
    #[error("Process '{name}' is not ready to run")]
    NotReady { name: String },

    /// An input port was written while the owning process was running.
    #[error("Input '{port}' of process '{process}' cannot change while it is running")]
    InputLocked { process: String, port: String },

    /// An output port was written after the owning process finished.
    #[error("Output '{port}' of process '{process}' cannot change after it finished")]
    OutputLocked { process: String, port: String },

    /// A resource of an unacceptable type was offered to a port.
    #[error("Port '{port}' of process '{process}' does not accept resources of type '{got}'")]
    IncompatibleResource {
        process: String,
        port: String,
        got: String,
    },

    /// The named port does not exist on the process.
    #[error("Process '{process}' has no port named '{port}'")]
    UnknownPort { process: String, port: String },

    /// The stored identity hash no longer matches the live definition.
    #[error("Process '{name}' is stale: stored hash '{stored}' does not match live hash '{live}'")]
    StaleProcess {
        name: String,
        stored: String,
        live: String,
    },

    /// The identity snapshot could not be hashed.
    #[error("Identity hash failed: {0}")]
    Identity(String),

    /// A job capture found an input resource that was never persisted.
    #[error("Input '{port}' of process '{process}' holds an unpersisted resource; save it before creating a job")]
    UnpersistedInput { process: String, port: String },

    /// A job was saved before its process record.
    #[error("Process '{process}' must be persisted before its job")]
    UnpersistedProcess { process: String },

    /// A job was saved before its config record.
    #[error("Config of process '{process}' must be persisted before its job")]
    UnpersistedConfig { process: String },

    /// A task finished without populating a required output.
    #[error("Required output '{port}' of process '{process}' was not populated")]
    MissingOutput { process: String, port: String },

    /// The task body failed. The process is left running; there is no retry.
    #[error("Task of process '{process}' failed: {source}")]
    Task {
        process: String,
        #[source]
        source: TaskError,
    },

    /// The scheduler ran out of runnable processes before the protocol finished.
    #[error("Protocol '{name}' stalled; still pending: {pending:?}")]
    Stalled { name: String, pending: Vec<String> },

    /// A queued job cannot be removed because its run already started.
    #[error("Job '{id}' has already started")]
    AlreadyStarted { id: String },

    /// The queue holds no pending job under this id.
    #[error("No pending job '{id}' in the queue")]
    NotQueued { id: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}
