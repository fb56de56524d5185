// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ConfigError;
use crate::validator::ParamValidator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declared kind of a config parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Str,
    Int,
    Float,
    Bool,
    Json,
}

/// Declaration of a single parameter: kind, optional default, description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub kind: ParamKind,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    pub fn new(kind: ParamKind) -> Self {
        Self {
            kind,
            default: None,
            description: String::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Parameter declarations, keyed by name.
pub type ConfigSpecs = BTreeMap<String, ParamSpec>;

/// Validated parameter bag bound to one run attempt.
///
/// Specs are write-once: they cannot be redefined once the config has been
/// persisted. Params are coerced against their spec at set-time through the
/// injected validator; unset params resolve to spec defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    specs: ConfigSpecs,
    params: BTreeMap<String, Value>,
    id: Option<String>,
}

impl Config {
    pub fn new(specs: ConfigSpecs) -> Self {
        Self {
            specs,
            params: BTreeMap::new(),
            id: None,
        }
    }

    pub fn specs(&self) -> &ConfigSpecs {
        &self.specs
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    pub(crate) fn mark_saved(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Resolves a parameter: explicit value, else spec default, else `Null`.
    /// Fatal on an undeclared name.
    pub fn get_param(&self, name: &str) -> Result<Value, ConfigError> {
        let spec = self
            .specs
            .get(name)
            .ok_or_else(|| ConfigError::UndeclaredParam {
                name: name.to_string(),
            })?;
        if let Some(value) = self.params.get(name) {
            return Ok(value.clone());
        }
        Ok(spec.default.clone().unwrap_or(Value::Null))
    }

    /// Validates and stores a parameter. Fatal on an undeclared name or a
    /// value the validator cannot coerce to the declared kind.
    pub fn set_param(
        &mut self,
        name: &str,
        raw: Value,
        validator: &dyn ParamValidator,
    ) -> Result<(), ConfigError> {
        let spec = self
            .specs
            .get(name)
            .ok_or_else(|| ConfigError::UndeclaredParam {
                name: name.to_string(),
            })?;
        let coerced = validator.coerce(name, spec, raw)?;
        self.params.insert(name.to_string(), coerced);
        Ok(())
    }

    /// Replaces the spec table. Rejected once the config has been persisted.
    pub fn redefine_specs(&mut self, specs: ConfigSpecs) -> Result<(), ConfigError> {
        if self.id.is_some() {
            return Err(ConfigError::SpecsFrozen);
        }
        self.specs = specs;
        Ok(())
    }
}
