// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Structural operators. These move elements without arithmetic, so they
//! accept every copyable dtype.

use super::{elements, input, invalid, resolve_axis};
use crate::BackendError;
use graph_ir::OperatorDef;
use tensor_core::{DType, Shape, Tensor, TensorData};

/// `Copy`: output is a copy of input 0.
pub(super) fn copy(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    Ok(vec![input(def, inputs, 0)?.clone()])
}

/// `Flatten`: collapses to 2-D around `axis` (default 1).
pub(super) fn flatten(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let x = input(def, inputs, 0)?;
    let dims = x.shape().dims();
    let axis = resolve_axis(def, def.arg_int("axis").unwrap_or(1), dims.len())?;
    let outer = elements(def, &dims[..axis])?;
    let inner = elements(def, &dims[axis..])?;
    Ok(vec![x.clone().reshape(Shape::matrix(outer, inner))?])
}

/// `Reshape`: new shape from the `shape` argument or from input 1.
///
/// A `0` keeps the input dimension at that position; one `-1` is inferred.
/// A second output, when declared, receives the old shape as int64.
pub(super) fn reshape(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let x = input(def, inputs, 0)?;
    let requested: Vec<i64> = match (def.arg_ints("shape"), inputs.get(1)) {
        (Some(dims), _) if !dims.is_empty() => dims.to_vec(),
        (_, Some(shape_tensor)) => match shape_tensor.data() {
            TensorData::I64(v) => v.clone(),
            TensorData::I32(v) => v.iter().map(|&d| i64::from(d)).collect(),
            other => {
                return Err(invalid(
                    def,
                    format!("shape input must be int32 or int64, got {}", other.dtype()),
                ))
            }
        },
        _ => return Err(invalid(def, "no target shape given")),
    };

    let new_shape = infer_shape(def, x.shape(), &requested)?;
    let old_shape = x.shape().to_i64();
    let mut outputs = vec![x.clone().reshape(new_shape)?];
    if def.output.len() > 1 {
        let rank = old_shape.len();
        outputs.push(Tensor::from_data(Shape::vector(rank), TensorData::I64(old_shape))?);
    }
    Ok(outputs)
}

fn infer_shape(def: &OperatorDef, input: &Shape, requested: &[i64]) -> Result<Shape, BackendError> {
    let mut dims = Vec::with_capacity(requested.len());
    let mut infer_at = None;
    for (i, &d) in requested.iter().enumerate() {
        match d {
            0 => dims.push(
                input
                    .dim(i)
                    .ok_or_else(|| invalid(def, format!("dimension {i} copies a missing input dimension")))?,
            ),
            -1 if infer_at.is_none() => {
                infer_at = Some(i);
                dims.push(1);
            }
            d if d > 0 => dims.push(d as usize),
            d => return Err(invalid(def, format!("invalid target dimension {d}"))),
        }
    }
    if let Some(i) = infer_at {
        let known = elements(def, &dims)?;
        let total = input.num_elements();
        if known == 0 || total % known != 0 {
            return Err(invalid(
                def,
                format!("cannot infer dimension {i}: {total} elements into {requested:?}"),
            ));
        }
        dims[i] = total / known;
    }
    Ok(Shape::new(dims))
}

/// `Cast`: converts every element to the dtype tag in `to`.
pub(super) fn cast(def: &OperatorDef, inputs: &[&Tensor]) -> Result<Vec<Tensor>, BackendError> {
    let x = input(def, inputs, 0)?;
    let tag = def.arg_int("to").ok_or_else(|| invalid(def, "missing 'to'"))?;
    let dtype = i32::try_from(tag)
        .ok()
        .and_then(DType::from_tag)
        .ok_or_else(|| invalid(def, format!("unknown dtype tag {tag}")))?;
    Ok(vec![x.cast(dtype)?])
}
