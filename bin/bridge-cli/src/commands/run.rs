// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `gb run` command: one set-input / execute / get-output cycle.
//!
//! Every registered input receives a batch of `--batch` items with each
//! element set to `--fill`.

use super::format_dims;
use anyhow::Context;
use runtime::EngineContext;
use std::path::PathBuf;
use std::time::Instant;
use tensor_core::{DType, Shape, Tensor};

/// Number of leading values printed for float outputs.
const PREVIEW: usize = 8;

pub fn execute(config: PathBuf, batch: usize, fill: f64) -> anyhow::Result<()> {
    anyhow::ensure!(batch > 0, "batch must be at least 1");

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              gb · Inference Runner                   ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let (_, mut ctx) = super::load(&config)?;
    println!("  Device: {}", ctx.device());
    println!("  Batch:  {batch}   Fill: {fill}");
    println!();

    // ── Inputs ─────────────────────────────────────────────────
    let names: Vec<String> = (0..ctx.input_count())
        .filter_map(|i| ctx.input_name(i).map(str::to_string))
        .collect();
    for name in &names {
        let (bytes, count, dims) = constant_batch(&ctx, name, batch, fill)?;
        ctx.set_input_batch(name, &bytes, count, &dims)
            .with_context(|| format!("failed to set input '{name}'"))?;
        println!("  in  {:<24} {:>10} elements  {}", name, count, format_dims(&dims));
    }

    // ── Execute ────────────────────────────────────────────────
    let start = Instant::now();
    ctx.execute()?;
    let elapsed = start.elapsed();
    println!();
    println!("  Executed in {:.3} ms", elapsed.as_secs_f64() * 1000.0);
    println!();

    // ── Outputs ────────────────────────────────────────────────
    for index in 0..ctx.output_count() {
        let name = ctx
            .output_name(index)
            .map(str::to_string)
            .context("output index out of range")?;
        let size = ctx.get_output_size(index)?;
        let rank = ctx.dims(&name)?.len();
        let mut out = vec![0u8; size];
        let mut dims = vec![0i64; rank];
        let written = ctx.get_output(index, &mut out, &mut dims)?;
        println!("  out {:<24} {:>10} bytes     {}", name, written, format_dims(&dims));

        if let Some(dtype) = ctx.dtype(&name).filter(|d| d.is_float()) {
            let preview = preview(&out[..written], dtype, &dims)?;
            println!("      {preview}");
        }
    }
    println!();
    Ok(())
}

/// Builds `batch` items of input `name` with every element set to `fill`.
fn constant_batch(
    ctx: &EngineContext,
    name: &str,
    batch: usize,
    fill: f64,
) -> anyhow::Result<(Vec<u8>, usize, Vec<i64>)> {
    let dtype = ctx.dtype(name).context("input has no dtype")?;
    let shape = Shape::from_i64(ctx.dims(name)?)?.with_batch(batch);
    let tensor = Tensor::full(shape, dtype, fill)?;
    Ok((
        tensor.as_bytes().to_vec(),
        tensor.num_elements(),
        tensor.shape().to_i64(),
    ))
}

fn preview(bytes: &[u8], dtype: DType, dims: &[i64]) -> anyhow::Result<String> {
    let values = Tensor::from_bytes(Shape::from_i64(dims)?, dtype, bytes)?.to_f64_vec();
    let head: Vec<String> = values.iter().take(PREVIEW).map(|v| format!("{v:.6}")).collect();
    let more = if values.len() > PREVIEW { ", ..." } else { "" };
    Ok(format!("[{}{more}]", head.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates() {
        let t = Tensor::full(Shape::vector(10), DType::F32, 0.5).unwrap();
        let p = preview(t.as_bytes(), DType::F32, &[10]).unwrap();
        assert!(p.starts_with("[0.500000, "));
        assert!(p.ends_with(", ...]"));
    }

    #[test]
    fn test_preview_short() {
        let t = Tensor::full(Shape::vector(2), DType::F64, 1.0).unwrap();
        assert_eq!(preview(t.as_bytes(), DType::F64, &[2]).unwrap(), "[1.000000, 1.000000]");
    }

    #[test]
    fn test_constant_batch() {
        let mut ctx = EngineContext::create(false);
        ctx.register_input("x", &[1, 2, 2], DType::I32.tag()).unwrap();
        let (bytes, count, dims) = constant_batch(&ctx, "x", 3, 2.0).unwrap();
        assert_eq!(count, 12);
        assert_eq!(bytes.len(), 48);
        assert_eq!(dims, vec![3, 2, 2]);
        assert_eq!(&bytes[..4], &2i32.to_le_bytes());
    }
}
