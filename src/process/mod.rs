// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;
pub mod process;
pub mod protocol;
pub mod registry;
pub mod task;

pub use config::{Config, ConfigSpecs, ParamKind, ParamSpec};
pub use process::{Process, ProcessKind};
pub use protocol::Subgraph;
pub use registry::TaskRegistry;
pub use task::{ProcessTask, TaskContext, TaskOutputs};
