// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod definition;
mod run;

pub use definition::DefinitionError;
pub use run::{ConfigError, RunError, StoreError, TaskError};
