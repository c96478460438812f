// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the set-input / execute / get-output cycle.

use backend::SimulatedAccelerator;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graph_ir::builder::{NetBuilder, OpBuilder};
use runtime::EngineContext;
use tensor_core::DType;

const PER_ITEM: usize = 3 * 224 * 224;

fn classifier_context(use_accelerator: bool) -> EngineContext {
    let init = NetBuilder::new("init")
        .op(OpBuilder::constant_fill("fc_w", &[1000, 3], DType::F32, 0.01))
        .op(OpBuilder::constant_fill("fc_b", &[1000], DType::F32, 0.0))
        .encode();
    let predict = NetBuilder::new("classifier")
        .external_input("data")
        .external_input("fc_w")
        .external_input("fc_b")
        .external_output("prob")
        .op(OpBuilder::new("AveragePool")
            .input("data")
            .output("pool")
            .arg_int("global_pooling", 1))
        .op(OpBuilder::new("Flatten").input("pool").output("flat"))
        .op(OpBuilder::new("FC")
            .input("flat")
            .input("fc_w")
            .input("fc_b")
            .output("logits"))
        .op(OpBuilder::new("Softmax").input("logits").output("prob"))
        .encode();

    let mut ctx = EngineContext::with_probe(use_accelerator, &SimulatedAccelerator { count: 1 });
    ctx.register_input("data", &[1, 3, 224, 224], DType::F32.tag())
        .unwrap();
    ctx.initialize_from_native(&init, &predict).unwrap();
    ctx
}

fn bench_set_input(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_input_batch");
    for batch in [1usize, 4] {
        let mut ctx = classifier_context(false);
        let bytes = vec![0u8; batch * PER_ITEM * 4];
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| {
                ctx.set_input_batch("data", black_box(&bytes), batch * PER_ITEM, &[1, 3, 224, 224])
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute_cycle");
    for (label, use_accelerator) in [("host", false), ("accelerator", true)] {
        let mut ctx = classifier_context(use_accelerator);
        let bytes = vec![0u8; PER_ITEM * 4];
        let mut out = vec![0u8; 4000];
        let mut dims = [0i64; 2];
        group.bench_function(label, |b| {
            b.iter(|| {
                ctx.set_input_batch("data", &bytes, PER_ITEM, &[1, 3, 224, 224])
                    .unwrap();
                ctx.execute().unwrap();
                ctx.get_output(0, black_box(&mut out), &mut dims).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_set_input, bench_cycle);
criterion_main!(benches);
