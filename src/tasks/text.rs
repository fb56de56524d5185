// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in text tasks used by the demo binary and the test suites.

use crate::errors::TaskError;
use crate::graph::port::PortSpec;
use crate::graph::resource::Resource;
use crate::process::config::{ConfigSpecs, ParamKind, ParamSpec};
use crate::process::task::{ProcessTask, TaskContext, TaskOutputs};
use async_trait::async_trait;
use serde_json::json;

fn text_of(ctx: &TaskContext, port: &str) -> Result<String, TaskError> {
    let resource = ctx.input(port)?;
    match resource.payload() {
        serde_json::Value::String(s) => Ok(s),
        other => Err(format!("port '{}' expected a text payload, got: {}", port, other).into()),
    }
}

/// Source task: emits the configured text as a fresh resource.
pub struct EmitTextTask;

#[async_trait]
impl ProcessTask for EmitTextTask {
    fn type_name(&self) -> &str {
        "emit_text"
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("text", "text")]
    }

    fn config_specs(&self) -> ConfigSpecs {
        let mut specs = ConfigSpecs::new();
        specs.insert(
            "text".to_string(),
            ParamSpec::new(ParamKind::Str)
                .with_default(json!("hello"))
                .describe("Text emitted on the 'text' output"),
        );
        specs
    }

    async fn task(&self, ctx: &TaskContext) -> Result<TaskOutputs, TaskError> {
        let text = ctx
            .param("text")?
            .as_str()
            .map(str::to_string)
            .unwrap_or_default();
        ctx.progress(format!("emitting {} bytes", text.len()));

        let mut outputs = TaskOutputs::new();
        outputs.set("text", Resource::new("text", json!(text)));
        Ok(outputs)
    }
}

/// Converts the input text to uppercase.
pub struct UppercaseTask;

#[async_trait]
impl ProcessTask for UppercaseTask {
    fn type_name(&self) -> &str {
        "uppercase"
    }

    fn input_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("text", "text")]
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("result", "text")]
    }

    async fn task(&self, ctx: &TaskContext) -> Result<TaskOutputs, TaskError> {
        let text = text_of(ctx, "text")?;
        let mut outputs = TaskOutputs::new();
        outputs.set("result", Resource::new("text", json!(text.to_uppercase())));
        Ok(outputs)
    }
}

/// Reverses the input text.
pub struct ReverseTask;

#[async_trait]
impl ProcessTask for ReverseTask {
    fn type_name(&self) -> &str {
        "reverse"
    }

    fn input_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("text", "text")]
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("result", "text")]
    }

    async fn task(&self, ctx: &TaskContext) -> Result<TaskOutputs, TaskError> {
        let text = text_of(ctx, "text")?;
        let reversed: String = text.chars().rev().collect();
        let mut outputs = TaskOutputs::new();
        outputs.set("result", Resource::new("text", json!(reversed)));
        Ok(outputs)
    }
}

/// Joins two text inputs with a configurable separator.
pub struct ConcatTask;

#[async_trait]
impl ProcessTask for ConcatTask {
    fn type_name(&self) -> &str {
        "concat"
    }

    fn input_specs(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::typed("left", "text"),
            PortSpec::typed("right", "text"),
        ]
    }

    fn output_specs(&self) -> Vec<PortSpec> {
        vec![PortSpec::typed("result", "text")]
    }

    fn config_specs(&self) -> ConfigSpecs {
        let mut specs = ConfigSpecs::new();
        specs.insert(
            "separator".to_string(),
            ParamSpec::new(ParamKind::Str)
                .with_default(json!(" "))
                .describe("Separator placed between the two inputs"),
        );
        specs
    }

    async fn task(&self, ctx: &TaskContext) -> Result<TaskOutputs, TaskError> {
        let left = text_of(ctx, "left")?;
        let right = text_of(ctx, "right")?;
        let separator = ctx
            .param("separator")?
            .as_str()
            .map(str::to_string)
            .unwrap_or_default();

        let mut outputs = TaskOutputs::new();
        outputs.set(
            "result",
            Resource::new("text", json!(format!("{}{}{}", left, separator, right))),
        );
        Ok(outputs)
    }
}
