// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Parameter validation seam.
//!
//! Config params are coerced against their declared kind at set-time through
//! a pluggable validator, so an embedding application can swap in stricter
//! rules (schemas, ranges, enums) without touching the config model.

use crate::errors::ConfigError;
use crate::process::config::{ParamKind, ParamSpec};
use serde_json::Value;

/// Coerces a raw parameter value to its declared kind, or fails.
pub trait ParamValidator: Send + Sync {
    fn coerce(&self, name: &str, spec: &ParamSpec, raw: Value) -> Result<Value, ConfigError>;
}

/// Default validator: accepts exact JSON kinds plus a few lossless coercions
/// (numeric strings to numbers, integral floats to ints, "true"/"false" to
/// booleans). Anything lossy is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonValidator;

impl JsonValidator {
    fn mismatch(name: &str, spec: &ParamSpec, raw: &Value) -> ConfigError {
        ConfigError::InvalidParamValue {
            name: name.to_string(),
            expected: spec.kind,
            got: raw.to_string(),
        }
    }
}

impl ParamValidator for JsonValidator {
    fn coerce(&self, name: &str, spec: &ParamSpec, raw: Value) -> Result<Value, ConfigError> {
        match spec.kind {
            ParamKind::Json => Ok(raw),
            ParamKind::Str => match raw {
                Value::String(_) => Ok(raw),
                other => Err(Self::mismatch(name, spec, &other)),
            },
            ParamKind::Int => match &raw {
                Value::Number(n) if n.as_i64().is_some() => Ok(raw),
                // i64::MAX as f64 rounds up to 2^63, so the upper bound is
                // exclusive.
                Value::Number(n) => match n.as_f64() {
                    Some(f)
                        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
                    {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(Self::mismatch(name, spec, &raw)),
                },
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| Self::mismatch(name, spec, &raw)),
                _ => Err(Self::mismatch(name, spec, &raw)),
            },
            ParamKind::Float => match &raw {
                Value::Number(n) => match n.as_f64() {
                    Some(f) => Ok(Value::from(f)),
                    None => Err(Self::mismatch(name, spec, &raw)),
                },
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| Self::mismatch(name, spec, &raw)),
                _ => Err(Self::mismatch(name, spec, &raw)),
            },
            ParamKind::Bool => match &raw {
                Value::Bool(_) => Ok(raw),
                Value::String(s) => match s.trim() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(Self::mismatch(name, spec, &raw)),
                },
                _ => Err(Self::mismatch(name, spec, &raw)),
            },
        }
    }
}
