// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use labflow::config::load_protocol;
use labflow::engine::Runner;
use labflow::graph::{Resource, ResourceRef};
use labflow::store::{MemoryResourceStore, MemoryStore, ResourceStore};
use labflow::tasks::builtin_registry;
use labflow::validator::JsonValidator;
use serde_json::json;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <protocol1.yaml> [protocol2.yaml ...] [--input <text>]", args[0]);
        eprintln!("Example: {} protocols/shout.yaml --input \"hello world\"", args[0]);
        std::process::exit(1);
    }

    let mut input_text = "hello world".to_string();
    let mut protocol_files = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--input" {
            input_text = iter
                .next()
                .context("--input requires a value")?
                .to_string();
        } else {
            protocol_files.push(arg.clone());
        }
    }

    for (i, file) in protocol_files.iter().enumerate() {
        if i > 0 {
            println!("\n{}", "-".repeat(72));
        }
        run_protocol(file, &input_text)
            .await
            .with_context(|| format!("protocol '{}' failed", file))?;
    }
    Ok(())
}

async fn run_protocol(file: &str, input_text: &str) -> anyhow::Result<()> {
    let definition = load_protocol(file)?;
    let registry = builtin_registry();
    let mut process = definition.build(&registry, &JsonValidator)?;

    let store = Arc::new(MemoryStore::new());
    let resources = Arc::new(MemoryResourceStore::new());
    let runner = Runner::new(store, resources.clone());

    // Feed the same text into every declared interface.
    let faces: Vec<String> = process.inputs().names().cloned().collect();
    for face in faces {
        let resource = ResourceRef::new(Resource::new("text", json!(input_text)));
        resources.save(&resource).await?;
        process.set_input(&face, resource)?;
    }

    println!("Protocol: {} ({})", process.name(), file);
    let report = runner.run(&mut process).await?;

    println!("Jobs: {}   Elapsed: {:?}", report.job_ids.len(), report.elapsed);
    if let Some(subgraph) = process.subgraph() {
        println!("Processes:");
        for (name, child) in subgraph.processes() {
            for (port, resource) in child.outputs().resource_map() {
                println!("  {}.{} = {}", name, port, resource.payload());
            }
        }
    }
    let outputs = process.outputs().resource_map();
    if !outputs.is_empty() {
        println!("Outputs:");
        for (port, resource) in outputs {
            println!("  {} = {}", port, resource.payload());
        }
    }
    Ok(())
}
