// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `gb inspect` command: initialize a context and list its bindings.

use super::format_dims;
use runtime::{EngineContext, ModelSource};
use std::path::PathBuf;

#[derive(Debug, serde::Serialize)]
struct BindingReport {
    index: usize,
    name: String,
    dtype: String,
    itemsize: usize,
    dims: Vec<i64>,
}

#[derive(Debug, serde::Serialize)]
struct ContextReport {
    device: String,
    graph: Option<String>,
    inputs: Vec<BindingReport>,
    outputs: Vec<BindingReport>,
}

fn binding(ctx: &EngineContext, index: usize, name: &str) -> BindingReport {
    BindingReport {
        index,
        name: name.to_string(),
        dtype: ctx
            .dtype(name)
            .map_or_else(|| "?".to_string(), |d| d.as_str().to_string()),
        itemsize: ctx.itemsize(name).unwrap_or(0),
        dims: ctx.dims(name).map(<[i64]>::to_vec).unwrap_or_default(),
    }
}

fn report(ctx: &EngineContext) -> ContextReport {
    ContextReport {
        device: ctx.device().to_string(),
        graph: ctx.graph_summary(),
        inputs: (0..ctx.input_count())
            .filter_map(|i| ctx.input_name(i).map(|n| binding(ctx, i, n)))
            .collect(),
        outputs: (0..ctx.output_count())
            .filter_map(|i| ctx.output_name(i).map(|n| binding(ctx, i, n)))
            .collect(),
    }
}

pub fn execute(config: PathBuf, json: bool) -> anyhow::Result<()> {
    let (cfg, ctx) = super::load(&config)?;
    let report = report(&ctx);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              gb · Context Inspector                  ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Summary ────────────────────────────────────────────────
    match &cfg.model {
        ModelSource::Native { init, predict } => {
            println!("  Init net:    {}", init.display());
            println!("  Predict net: {}", predict.display());
        }
        ModelSource::Interchange { path } => println!("  Model:       {}", path.display()),
    }
    println!("  Device:      {}", report.device);
    if let Some(graph) = &report.graph {
        println!("  Graph:       {graph}");
    }
    println!();

    for (title, bindings) in [("Inputs", &report.inputs), ("Outputs", &report.outputs)] {
        println!("  {title}:");
        println!(
            "  {:<4} {:<30} {:<10} {:>5}  {}",
            "Idx", "Name", "Dtype", "Size", "Dims",
        );
        println!("  {}", "-".repeat(70));
        for b in bindings {
            println!(
                "  {:<4} {:<30} {:<10} {:>5}  {}",
                b.index,
                truncate(&b.name, 30),
                b.dtype,
                b.itemsize,
                format_dims(&b.dims),
            );
        }
        println!();
    }
    Ok(())
}

/// Truncates a string to `max_len` characters with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
