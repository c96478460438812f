// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: serialized graphs in, bytes out.
//!
//! These tests build graphs with the `graph-ir` builders, hand their
//! encoded bytes to a context the way a host program would, and check the
//! full register → initialize → set-input → execute → get-output cycle
//! through both the safe API and the C ABI.

use backend::SimulatedAccelerator;
use graph_ir::builder::{NetBuilder, OpBuilder};
use graph_ir::onnx::{
    elem, AttributeProto, GraphProto, ModelProto, NodeProto, TensorProto, ValueInfoProto,
};
use prost::Message;
use runtime::ffi::*;
use runtime::{EngineConfig, EngineContext, EngineState, RuntimeError};
use std::ffi::CStr;
use std::ptr;
use tensor_core::DType;

// ── Helpers ────────────────────────────────────────────────────

const IMAGE: [i64; 4] = [1, 3, 224, 224];
const CLASSES: usize = 1000;

/// Global pool → flatten → FC → softmax over a 3x224x224 image.
fn classifier() -> (Vec<u8>, Vec<u8>) {
    let init = NetBuilder::new("classifier_init")
        .op(OpBuilder::constant_fill("fc_w", &[CLASSES as i64, 3], DType::F32, 0.01))
        .op(OpBuilder::constant_fill("fc_b", &[CLASSES as i64], DType::F32, 0.0))
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
    (init, predict)
}

fn classifier_context() -> EngineContext {
    let (init, predict) = classifier();
    let mut ctx = EngineContext::create(false);
    ctx.register_input("data", &IMAGE, DType::F32.tag()).unwrap();
    ctx.initialize_from_native(&init, &predict).unwrap();
    ctx
}

/// `n` independent `Copy` ops: `in_i` → `out_i`.
fn copies(n: usize) -> (Vec<u8>, Vec<u8>) {
    let init = NetBuilder::new("init").encode();
    let mut predict = NetBuilder::new("copies");
    for i in 0..n {
        predict = predict
            .external_input(&format!("in_{i}"))
            .external_output(&format!("out_{i}"))
            .op(OpBuilder::new("Copy")
                .input(&format!("in_{i}"))
                .output(&format!("out_{i}")));
    }
    (init, predict.encode())
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 1) as u8).collect()
}

fn f32s(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

// ── Scenario ───────────────────────────────────────────────────

#[test]
fn test_classifier_zeros_give_uniform_probabilities() {
    let mut ctx = classifier_context();
    assert_eq!(ctx.state(), EngineState::Ready);
    assert_eq!(ctx.output_count(), 1);
    assert_eq!(ctx.output_name(0), Some("prob"));
    assert_eq!(ctx.dims("prob").unwrap(), &[1, CLASSES as i64]);

    let elements = 3 * 224 * 224;
    let zeros = vec![0u8; elements * 4];
    ctx.set_input_batch("data", &zeros, elements, &IMAGE).unwrap();
    ctx.execute().unwrap();

    assert_eq!(ctx.get_output_size(0).unwrap(), 4000);
    let mut out = vec![0u8; 4000];
    let mut dims = [0i64; 2];
    assert_eq!(ctx.get_output(0, &mut out, &mut dims).unwrap(), 4000);
    assert_eq!(dims, [1, 1000]);
    for p in f32s(&out) {
        assert!((p - 0.001).abs() < 1e-6, "expected uniform, got {p}");
    }
}

#[test]
fn test_classifier_batch_of_two() {
    let mut ctx = classifier_context();
    let elements = 2 * 3 * 224 * 224;
    let ones: Vec<u8> = std::iter::repeat(1.0f32.to_le_bytes())
        .take(elements)
        .flatten()
        .collect();
    ctx.set_input_batch("data", &ones, elements, &IMAGE).unwrap();
    ctx.execute().unwrap();

    assert_eq!(ctx.get_output_size(0).unwrap(), 8000);
    let mut out = vec![0u8; 8000];
    let mut dims = [0i64; 2];
    ctx.get_output(0, &mut out, &mut dims).unwrap();
    assert_eq!(dims, [2, 1000]);
    assert_eq!(ctx.dims("prob").unwrap(), &[2, 1000]);
    let sum: f32 = f32s(&out[..4000]).iter().sum();
    assert!((sum - 1.0).abs() < 1e-3);
}

// ── Properties ─────────────────────────────────────────────────

#[test]
fn test_set_input_accepts_only_whole_items() {
    let (init, predict) = copies(1);
    let mut ctx = EngineContext::create(false);
    ctx.register_input("in_0", &[1, 2, 3, 4], DType::U8.tag()).unwrap();
    ctx.initialize_from_native(&init, &predict).unwrap();

    for count in [1usize, 23, 24, 25, 47, 48, 72, 100, 240] {
        let result = ctx.set_input_batch("in_0", &pattern(count), count, &[9, 2, 3, 4]);
        if count % 24 == 0 {
            result.unwrap();
            ctx.execute().unwrap();
            let mut dims = [0i64; 4];
            let mut out = vec![0u8; count];
            ctx.get_output(0, &mut out, &mut dims).unwrap();
            assert_eq!(dims, [(count / 24) as i64, 2, 3, 4]);
            assert_eq!(out, pattern(count));
        } else {
            assert!(matches!(result, Err(RuntimeError::NotBatchMultiple { .. })), "{count}");
        }
    }
}

#[test]
fn test_every_copyable_dtype_round_trips() {
    let (init, predict) = copies(1);
    let probe = SimulatedAccelerator { count: 1 };
    for use_accelerator in [false, true] {
        for dtype in DType::ALL {
            if dtype == DType::String || (dtype == DType::F16 && !use_accelerator) {
                continue;
            }
            let mut ctx = EngineContext::with_probe(use_accelerator, &probe);
            ctx.register_input("in_0", &[1, 3], dtype.tag()).unwrap();
            ctx.initialize_from_native(&init, &predict).unwrap();
            assert_eq!(ctx.dtype("out_0"), Some(dtype));
            assert_eq!(ctx.itemsize("out_0"), Some(dtype.size_bytes()));

            let bytes = pattern(6 * dtype.size_bytes());
            ctx.set_input_batch("in_0", &bytes, 6, &[1, 3]).unwrap();
            ctx.execute().unwrap();

            let mut out = vec![0u8; bytes.len()];
            let mut dims = [0i64; 2];
            let written = ctx.get_output(0, &mut out, &mut dims).unwrap();
            assert_eq!(written, bytes.len(), "{dtype}");
            assert_eq!(dims, [2, 3], "{dtype}");
            assert_eq!(out, bytes, "{dtype}");
        }
    }
}

#[test]
fn test_string_input_is_rejected() {
    let (init, predict) = copies(1);
    let mut ctx = EngineContext::create(false);
    ctx.register_input("in_0", &[1, 3], DType::String.tag()).unwrap();
    let err = ctx.initialize_from_native(&init, &predict).unwrap_err();
    assert!(matches!(err, RuntimeError::UnsupportedDType { dtype: DType::String, .. }));
    assert_eq!(ctx.state(), EngineState::Fault);
    assert_eq!(ctx.output_count(), 0);
}

#[test]
fn test_indices_are_a_bijection() {
    let n = 6;
    let (init, predict) = copies(n);
    let mut ctx = EngineContext::create(false);
    for i in (0..n).rev() {
        let index = ctx
            .register_input(&format!("in_{i}"), &[1, 2], DType::I32.tag())
            .unwrap();
        assert_eq!(index, n - 1 - i);
    }
    ctx.initialize_from_native(&init, &predict).unwrap();

    assert_eq!(ctx.input_count(), n);
    assert_eq!(ctx.output_count(), n);
    for i in 0..n {
        let name = ctx.output_name(i).unwrap().to_string();
        assert_eq!(name, format!("out_{i}"));
        assert_eq!(ctx.get_output_index(&name), Some(i));
        assert_eq!(ctx.input_name(i), Some(format!("in_{}", n - 1 - i).as_str()));
    }
    assert!(ctx.output_name(n).is_none());
}

#[test]
fn test_discovery_is_deterministic() {
    let a = classifier_context();
    let b = classifier_context();
    assert_eq!(a.output_count(), b.output_count());
    for i in 0..a.output_count() {
        let name = a.output_name(i).unwrap();
        assert_eq!(Some(name), b.output_name(i));
        assert_eq!(a.dims(name).unwrap(), b.dims(name).unwrap());
        assert_eq!(a.dtype(name), b.dtype(name));
        assert_eq!(a.itemsize(name), b.itemsize(name));
    }
}

#[test]
fn test_shape_buffer_length_contract() {
    let mut ctx = classifier_context();
    for len in [0usize, 1, 3] {
        let mut dims = vec![0i64; len];
        assert!(ctx.get_dimensions("prob", &mut dims).is_err());
        assert!(ctx.get_output(0, &mut [0u8; 4000], &mut dims).is_err());
    }
    let mut dims = [0i64; 4];
    assert_eq!(ctx.get_dimensions("data", &mut dims).unwrap(), 4);
    assert_eq!(dims, IMAGE);
}

// ── Interchange models ─────────────────────────────────────────

fn interchange_model() -> Vec<u8> {
    let attr = |name: &str, i: i64| AttributeProto {
        name: name.into(),
        i,
        ..Default::default()
    };
    let node = |op: &str, inputs: &[&str], outputs: &[&str]| NodeProto {
        op_type: op.into(),
        input: inputs.iter().map(|s| s.to_string()).collect(),
        output: outputs.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    let mut gemm = node("Gemm", &["x", "W", "B"], &["h"]);
    gemm.attribute.push(attr("transB", 1));
    let mut softmax = node("Softmax", &["h"], &["y"]);
    softmax.attribute.push(attr("axis", 1));

    ModelProto {
        ir_version: 7,
        producer_name: "integration".into(),
        graph: Some(GraphProto {
            name: "linear_softmax".into(),
            node: vec![gemm, softmax],
            initializer: vec![
                TensorProto {
                    name: "W".into(),
                    dims: vec![2, 2],
                    data_type: elem::FLOAT,
                    float_data: vec![1.0, 0.0, 0.0, 1.0],
                    ..Default::default()
                },
                TensorProto {
                    name: "B".into(),
                    dims: vec![2],
                    data_type: elem::FLOAT,
                    float_data: vec![0.0, 0.0],
                    ..Default::default()
                },
            ],
            input: vec![ValueInfoProto { name: "x".into() }],
            output: vec![ValueInfoProto { name: "y".into() }],
        }),
    }
    .encode_to_vec()
}

#[test]
fn test_interchange_model_runs() {
    let mut ctx = EngineContext::create(false);
    ctx.register_input("x", &[1, 2], DType::F32.tag()).unwrap();
    ctx.initialize_from_interchange(&interchange_model()).unwrap();
    assert_eq!(ctx.output_name(0), Some("y"));

    let x: Vec<u8> = [3.0f32, 3.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    ctx.set_input_batch("x", &x, 2, &[1, 2]).unwrap();
    ctx.execute().unwrap();
    let mut out = [0u8; 8];
    let mut dims = [0i64; 2];
    ctx.get_output(0, &mut out, &mut dims).unwrap();
    assert_eq!(f32s(&out), vec![0.5, 0.5]);
}

// ── C ABI ──────────────────────────────────────────────────────

fn last_error() -> String {
    let p = gb_last_error();
    assert!(!p.is_null());
    unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
}

#[test]
fn test_abi_end_to_end() {
    let (init, predict) = classifier();
    unsafe {
        let ctx = gb_engine_create(1);
        assert_eq!(gb_engine_uses_accelerator(ctx), 0);

        let data = b"data\0".as_ptr().cast();
        assert_eq!(gb_engine_register_input(ctx, data, IMAGE.as_ptr(), 4, 1), 0);
        assert_eq!(
            gb_engine_initialize_native(
                ctx,
                init.as_ptr().cast(),
                init.len(),
                predict.as_ptr().cast(),
                predict.len()
            ),
            0
        );
        assert_eq!(gb_engine_get_input_count(ctx), 1);
        assert_eq!(gb_engine_get_output_count(ctx), 1);
        let out_name = CStr::from_ptr(gb_engine_get_output_name(ctx, 0));
        assert_eq!(out_name.to_str().unwrap(), "prob");
        assert_eq!(gb_engine_get_output_index(ctx, out_name.as_ptr()), 0);
        assert_eq!(gb_engine_get_dtype(ctx, out_name.as_ptr()), 1);
        assert_eq!(gb_engine_get_itemsize(ctx, out_name.as_ptr()), 4);
        assert_eq!(gb_engine_get_dimensions(ctx, out_name.as_ptr(), ptr::null_mut(), 0), 2);

        let elements = 3 * 224 * 224;
        let zeros = vec![0f32; elements];
        assert_eq!(
            gb_set_input_batch(ctx, data, zeros.as_ptr().cast(), elements, IMAGE.as_ptr(), 4),
            0
        );
        assert_eq!(gb_execute_batch(ctx), 0);
        assert_eq!(gb_engine_get_output_size(ctx, 0), 4000);

        let mut out = vec![0u8; 4000];
        let mut dims = [0i64; 2];
        let written = gb_engine_get_output(
            ctx,
            0,
            out.as_mut_ptr().cast(),
            out.len(),
            dims.as_mut_ptr(),
            2,
        );
        assert_eq!(written, 4000);
        assert_eq!(dims, [1, 1000]);

        // Too-small buffer: nothing written, error recorded.
        let mut small = [0u8; 16];
        assert_eq!(
            gb_engine_get_output(ctx, 0, small.as_mut_ptr().cast(), 16, dims.as_mut_ptr(), 2),
            -1
        );
        assert!(last_error().contains("4000"));
        assert_eq!(small, [0u8; 16]);

        // Count that is not a whole number of items.
        assert_eq!(
            gb_set_input_batch(ctx, data, zeros.as_ptr().cast(), 7, IMAGE.as_ptr(), 4),
            -1
        );
        assert!(last_error().contains("multiple"));

        gb_engine_destroy(ctx);
    }
}

#[test]
fn test_abi_interchange_and_fault() {
    let model = interchange_model();
    unsafe {
        let ctx = gb_engine_create(0);
        let shape = [1i64, 2];
        let x = b"x\0".as_ptr().cast();
        assert_eq!(gb_engine_register_input(ctx, x, shape.as_ptr(), 2, 1), 0);
        assert_eq!(
            gb_engine_initialize_interchange(ctx, model.as_ptr().cast(), model.len()),
            0
        );
        assert_eq!(gb_engine_get_output_count(ctx), 1);
        gb_engine_destroy(ctx);

        let broken = gb_engine_create(0);
        let garbage = [0xFFu8; 4];
        assert_eq!(
            gb_engine_initialize_interchange(broken, garbage.as_ptr().cast(), garbage.len()),
            -1
        );
        assert!(last_error().contains("graph error"));
        assert_eq!(gb_execute_batch(broken), -1);
        assert!(last_error().contains("faulted"));
        assert_eq!(gb_engine_get_output_count(broken), 0);
        gb_engine_destroy(broken);
    }
}

#[test]
fn test_overflowing_shape_faults() {
    // Registration refuses shapes whose size cannot be represented.
    let (init, predict) = copies(1);
    let mut ctx = EngineContext::create(false);
    assert!(ctx
        .register_input("in_0", &[1, 1 << 33, 1 << 33], DType::F32.tag())
        .is_err());
    assert_eq!(ctx.input_count(), 0);
    ctx.register_input("in_0", &[1, 4], DType::F32.tag()).unwrap();
    ctx.initialize_from_native(&init, &predict).unwrap();
    assert_eq!(ctx.state(), EngineState::Ready);

    // A fill in the init net with an overflowing shape faults initialize.
    let init = NetBuilder::new("init")
        .op(OpBuilder::constant_fill("w", &[1 << 33, 1 << 33], DType::F32, 0.0))
        .encode();
    let predict = NetBuilder::new("predict")
        .external_input("x")
        .external_input("w")
        .external_output("y")
        .op(OpBuilder::new("Copy").input("x").output("y"))
        .encode();
    let mut ctx = EngineContext::create(false);
    ctx.register_input("x", &[1, 2], DType::F32.tag()).unwrap();
    let err = ctx.initialize_from_native(&init, &predict).unwrap_err();
    assert!(err.to_string().contains("overflows"), "{err}");
    assert_eq!(ctx.state(), EngineState::Fault);
    assert_eq!(ctx.output_count(), 0);
}

#[test]
fn test_abi_rejects_huge_element_counts() {
    let (init, predict) = classifier();
    unsafe {
        let ctx = gb_engine_create(0);
        let data = b"data\0".as_ptr().cast();
        let huge = [1i64, 1 << 33, 1 << 33, 1];
        assert_eq!(gb_engine_register_input(ctx, data, huge.as_ptr(), 4, 1), -1);
        assert!(last_error().contains("overflows"));

        assert_eq!(gb_engine_register_input(ctx, data, IMAGE.as_ptr(), 4, 1), 0);
        assert_eq!(
            gb_engine_initialize_native(
                ctx,
                init.as_ptr().cast(),
                init.len(),
                predict.as_ptr().cast(),
                predict.len()
            ),
            0
        );
        let zeros = vec![0f32; 3 * 224 * 224];
        assert_eq!(
            gb_set_input_batch(ctx, data, zeros.as_ptr().cast(), usize::MAX, IMAGE.as_ptr(), 4),
            -1
        );
        assert!(last_error().contains("too large"));
        assert_eq!(gb_execute_batch(ctx), 0);
        gb_engine_destroy(ctx);

        // One-byte elements: the byte length itself is out of range.
        let (init, predict) = copies(1);
        let ctx = gb_engine_create(0);
        let input = b"in_0\0".as_ptr().cast();
        let shape = [1i64, 4];
        assert_eq!(gb_engine_register_input(ctx, input, shape.as_ptr(), 2, 6), 0);
        assert_eq!(
            gb_engine_initialize_native(
                ctx,
                init.as_ptr().cast(),
                init.len(),
                predict.as_ptr().cast(),
                predict.len()
            ),
            0
        );
        let bytes = [0u8; 4];
        assert_eq!(
            gb_set_input_batch(ctx, input, bytes.as_ptr().cast(), usize::MAX, shape.as_ptr(), 2),
            -1
        );
        assert!(last_error().contains("too large"));
        gb_engine_destroy(ctx);
    }
}

// ── Configuration ──────────────────────────────────────────────

#[test]
fn test_config_loads_context_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let (init, predict) = classifier();
    std::fs::write(dir.path().join("init_net.pb"), init).unwrap();
    std::fs::write(dir.path().join("predict_net.pb"), predict).unwrap();
    let config_path = dir.path().join("engine.toml");
    std::fs::write(
        &config_path,
        r#"
use_accelerator = true
simulated_accelerators = 1

[model]
format = "native"
init = "init_net.pb"
predict = "predict_net.pb"

[[inputs]]
name = "data"
shape = [1, 3, 224, 224]
dtype = "float32"
"#,
    )
    .unwrap();

    let config = EngineConfig::from_file(&config_path).unwrap();
    let ctx = config.load_context().unwrap();
    assert!(ctx.uses_accelerator());
    assert_eq!(ctx.state(), EngineState::Ready);
    assert_eq!(ctx.get_output_size(0).unwrap(), 4000);
}
