// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod text;

pub use text::{ConcatTask, EmitTextTask, ReverseTask, UppercaseTask};

use crate::process::registry::TaskRegistry;
use std::sync::Arc;

/// Registry pre-loaded with every built-in task.
pub fn builtin_registry() -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    registry.register(Arc::new(EmitTextTask));
    registry.register(Arc::new(UppercaseTask));
    registry.register(Arc::new(ReverseTask));
    registry.register(Arc::new(ConcatTask));
    registry
}
