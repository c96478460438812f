// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arithmetic operators (float32 only).

use super::{elements, input, invalid, resolve_axis};
use crate::BackendError;
use graph_ir::OperatorDef;
use tensor_core::{DType, Shape, Tensor};

fn coerce_2d(def: &OperatorDef, shape: &Shape, axis: i64) -> Result<(usize, usize), BackendError> {
    let dims = shape.dims();
    let axis = resolve_axis(def, axis, dims.len())?;
    Ok((elements(def, &dims[..axis])?, elements(def, &dims[axis..])?))
}

fn map_f32(x: &Tensor, f: impl Fn(f32) -> f32) -> Result<Tensor, BackendError> {
    let values: Vec<f32> = x.as_f32()?.iter().map(|&v| f(v)).collect();
    Ok(Tensor::from_f32(x.shape().clone(), &values)?)
}

/// `FC`: `Y = X · Wᵀ + b`.
///
/// `X` is coerced to `[M, K]` around `axis` (default 1), `W` to `[N, K]`
/// around `axis_w` (default 1). The bias is optional and has `N` elements.
pub(super) fn fc(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let x = input(def, inputs, 0)?;
    let w = input(def, inputs, 1)?;
    let (m, k) = coerce_2d(def, x.shape(), def.arg_int("axis").unwrap_or(1))?;
    let (n, kw) = coerce_2d(def, w.shape(), def.arg_int("axis_w").unwrap_or(1))?;
    if k != kw {
        return Err(invalid(
            def,
            format!("input {} has {k} features, weight {} expects {kw}", x.shape(), w.shape()),
        ));
    }

    let x2 = x.clone().reshape(Shape::matrix(m, k))?;
    let w2 = w.clone().reshape(Shape::matrix(n, k))?;
    let mut y = Tensor::zeros(Shape::matrix(m, n), DType::F32)?;
    tensor_core::matmul_transposed(&x2, &w2, &mut y)?;

    if let Some(b) = inputs.get(2) {
        let bias = b.as_f32()?;
        if bias.len() != n {
            return Err(invalid(def, format!("bias has {} elements, expected {n}", bias.len())));
        }
        for row in y.as_f32_mut()?.chunks_mut(n.max(1)) {
            for (v, b) in row.iter_mut().zip(bias) {
                *v += b;
            }
        }
    }
    Ok(vec![y])
}

/// `MatMul`: 2-D product, with optional `trans_b`.
pub(super) fn matmul(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let a = input(def, inputs, 0)?;
    let b = input(def, inputs, 1)?;
    let (ad, bd) = (a.shape().dims(), b.shape().dims());
    if ad.len() != 2 || bd.len() != 2 {
        return Err(invalid(def, format!("MatMul needs 2-D inputs, got {} and {}", a.shape(), b.shape())));
    }
    let trans_b = def.arg_int("trans_b").unwrap_or(0) != 0;
    let n = if trans_b { bd[0] } else { bd[1] };
    let mut y = Tensor::zeros(Shape::matrix(ad[0], n), DType::F32)?;
    if trans_b {
        tensor_core::matmul_transposed(a, b, &mut y)?;
    } else {
        tensor_core::matmul(a, b, &mut y)?;
    }
    Ok(vec![y])
}

/// `Softmax`: coerces to 2-D around `axis` (default 1) and normalizes rows.
pub(super) fn softmax(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let x = input(def, inputs, 0)?;
    let (outer, inner) = coerce_2d(def, x.shape(), def.arg_int("axis").unwrap_or(1))?;
    let x2 = x.clone().reshape(Shape::matrix(outer, inner))?;
    let mut y = Tensor::zeros(Shape::matrix(outer, inner), DType::F32)?;
    tensor_core::softmax(&x2, &mut y)?;
    Ok(vec![y.reshape(x.shape().clone())?])
}

/// `Relu`: `max(x, 0)`.
pub(super) fn relu(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    Ok(vec![map_f32(input(def, inputs, 0)?, |v| v.max(0.0))?])
}

/// `Scale`: `x * scale` (default 1).
pub(super) fn scale(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let s = def.arg_float("scale").unwrap_or(1.0);
    Ok(vec![map_f32(input(def, inputs, 0)?, |v| v * s)?])
}

/// `Add`: element-wise sum with numpy-style broadcasting.
pub(super) fn add(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    broadcast_binary(def, input(def, inputs, 0)?, input(def, inputs, 1)?, |a, b| a + b)
}

/// `Mul`: element-wise product with numpy-style broadcasting.
pub(super) fn mul(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    broadcast_binary(def, input(def, inputs, 0)?, input(def, inputs, 1)?, |a, b| a * b)
}

/// `Sum`: element-wise sum of one or more same-shape inputs.
pub(super) fn sum(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let first = input(def, inputs, 0)?;
    let mut acc = first.as_f32()?.to_vec();
    for other in &inputs[1..] {
        if other.shape() != first.shape() {
            return Err(invalid(
                def,
                format!("Sum inputs differ in shape: {} vs {}", first.shape(), other.shape()),
            ));
        }
        for (a, b) in acc.iter_mut().zip(other.as_f32()?) {
            *a += b;
        }
    }
    Ok(vec![Tensor::from_f32(first.shape().clone(), &acc)?])
}

/// `AveragePool` with `global_pooling=1`: mean over every spatial dimension
/// of an `[N, C, ...]` input; spatial dimensions become 1.
pub(super) fn average_pool(
    def: &OperatorDef,
    inputs: &[&Tensor],
) -> Result<Vec<Tensor>, BackendError> {
    if def.arg_int("global_pooling").unwrap_or(0) == 0 {
        return Err(invalid(def, "only global average pooling is supported"));
    }
    let x = input(def, inputs, 0)?;
    let dims = x.shape().dims();
    if dims.len() < 3 {
        return Err(invalid(def, format!("expected [N, C, spatial...], got {}", x.shape())));
    }
    let values = x.as_f32()?;
    let spatial = elements(def, &dims[2..])?;
    let mut out_dims = dims.to_vec();
    out_dims[2..].iter_mut().for_each(|d| *d = 1);
    if spatial == 0 {
        return Ok(vec![Tensor::zeros(Shape::new(out_dims), DType::F32)?]);
    }
    let means: Vec<f32> = values
        .chunks(spatial)
        .map(|c| c.iter().sum::<f32>() / spatial as f32)
        .collect();
    Ok(vec![Tensor::from_f32(Shape::new(out_dims), &means)?])
}

fn broadcast_binary(
    def: &OperatorDef,
    a: &Tensor,
    b: &Tensor,
    f: impl Fn(f32, f32) -> f32,
) -> Result<Vec<Tensor>, BackendError> {
    let (av, bv) = (a.as_f32()?, b.as_f32()?);
    if a.shape() == b.shape() {
        let values: Vec<f32> = av.iter().zip(bv).map(|(&x, &y)| f(x, y)).collect();
        return Ok(vec![Tensor::from_f32(a.shape().clone(), &values)?]);
    }
    if !a.shape().is_broadcast_compatible(b.shape()) {
        return Err(invalid(
            def,
            format!("shapes {} and {} do not broadcast", a.shape(), b.shape()),
        ));
    }

    let rank = a.shape().rank().max(b.shape().rank());
    let pad = |s: &Shape| -> Vec<usize> {
        let mut d = vec![1; rank - s.rank()];
        d.extend_from_slice(s.dims());
        d
    };
    let (ad, bd) = (pad(a.shape()), pad(b.shape()));
    let out: Vec<usize> = ad.iter().zip(&bd).map(|(&x, &y)| x.max(y)).collect();
    // Broadcast dimensions get stride 0.
    let strides = |d: &[usize]| -> Vec<usize> {
        let mut s = vec![0; rank];
        let mut acc = 1;
        for i in (0..rank).rev() {
            s[i] = if d[i] == 1 { 0 } else { acc };
            acc *= d[i];
        }
        s
    };
    let (a_strides, b_strides) = (strides(&ad), strides(&bd));

    let total = elements(def, &out)?;
    let mut values = Vec::new();
    values
        .try_reserve_exact(total)
        .map_err(|_| invalid(def, format!("cannot allocate broadcast output {out:?}")))?;
    let mut index = vec![0usize; rank];
    for _ in 0..total {
        let ai: usize = index.iter().zip(&a_strides).map(|(i, s)| i * s).sum();
        let bi: usize = index.iter().zip(&b_strides).map(|(i, s)| i * s).sum();
        values.push(f(av[ai], bv[bi]));
        for d in (0..rank).rev() {
            index[d] += 1;
            if index[d] < out[d] {
                break;
            }
            index[d] = 0;
        }
    }
    Ok(vec![Tensor::from_f32(Shape::new(out), &values)?])
}
