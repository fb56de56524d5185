// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // protocol definitions + validation
pub mod engine;     // run scheduler, jobs, queue
pub mod errors;     // error handling
pub mod graph;      // resources, ports, connectors
pub mod identity;   // content-hash identity
pub mod observability;
pub mod process;    // processes, protocols, tasks
pub mod store;      // persistence contracts + in-memory backends
pub mod tasks;      // built-in task implementations
pub mod validator;  // config param coercion
