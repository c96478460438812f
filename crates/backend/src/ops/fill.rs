// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fill operators: produce tensors from arguments alone.

use super::invalid;
use crate::BackendError;
use graph_ir::OperatorDef;
use tensor_core::{DType, Shape, Tensor, TensorData};

fn fill_dtype(def: &OperatorDef) -> Result<DType, BackendError> {
    let tag = def.arg_int("dtype").unwrap_or(i64::from(DType::F32.tag()));
    i32::try_from(tag)
        .ok()
        .and_then(DType::from_tag)
        .ok_or_else(|| invalid(def, format!("unknown dtype tag {tag}")))
}

fn fill_shape(def: &OperatorDef) -> Result<Shape, BackendError> {
    let dims = def.arg_ints("shape").unwrap_or(&[]);
    Ok(Shape::from_i64(dims)?)
}

/// `GivenTensorFill`: a constant tensor spelled out in the arguments.
///
/// Arguments: `shape` (ints), `dtype` (tag, default float32) and `values`
/// as raw little-endian bytes (`s`), floats or ints.
pub(super) fn given_tensor_fill(
    def: &OperatorDef,
    _inputs: &[&Tensor],
) -> Result<Vec<Tensor>, BackendError> {
    let dtype = fill_dtype(def)?;
    let shape = fill_shape(def)?;
    let values = def
        .arg("values")
        .ok_or_else(|| invalid(def, "missing 'values'"))?;

    let tensor = if let Some(bytes) = &values.s {
        Tensor::from_bytes(shape, dtype, bytes)?
    } else if !values.floats.is_empty() {
        let widened: Vec<f64> = values.floats.iter().map(|&v| f64::from(v)).collect();
        Tensor::from_data(shape, TensorData::from_f64(dtype, &widened)?)?
    } else if !values.ints.is_empty() {
        // Through i64 directly so 64-bit values keep full precision.
        let data = match dtype {
            DType::I64 => TensorData::I64(values.ints.clone()),
            _ => {
                let widened: Vec<f64> = values.ints.iter().map(|&v| v as f64).collect();
                TensorData::from_f64(dtype, &widened)?
            }
        };
        Tensor::from_data(shape, data)?
    } else {
        // Zero-element tensors carry no values.
        Tensor::zeros(shape, dtype)?
    };
    Ok(vec![tensor])
}

/// `ConstantFill`: every element set to `value` (default 0).
///
/// The shape comes from the `shape` argument, or from the first input when
/// one is given.
pub(super) fn constant_fill(
    def: &OperatorDef,
    inputs: &[&Tensor],
) -> Result<Vec<Tensor>, BackendError> {
    let dtype = fill_dtype(def)?;
    let shape = match inputs.first() {
        Some(like) if def.arg("shape").is_none() => like.shape().clone(),
        _ => fill_shape(def)?,
    };
    let value = def
        .arg_float("value")
        .map(f64::from)
        .or_else(|| def.arg_int("value").map(|v| v as f64))
        .unwrap_or(0.0);
    Ok(vec![Tensor::full(shape, dtype, value)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_ir::builder::OpBuilder;
    use graph_ir::Argument;
    use tensor_core::TensorError;

    #[test]
    fn test_given_tensor_fill_raw_bytes() {
        let t = Tensor::full(Shape::new(vec![2, 2]), DType::U16, 513.0).unwrap();
        let def = OpBuilder::given_tensor_fill("w", &t).build();
        let out = given_tensor_fill(&def, &[]).unwrap();
        assert_eq!(out, vec![t]);
    }

    #[test]
    fn test_given_tensor_fill_floats() {
        let def = OpBuilder::new("GivenTensorFill")
            .output("w")
            .arg_ints("shape", vec![3])
            .arg_floats("values", vec![1.0, 2.0, 3.0])
            .build();
        let out = given_tensor_fill(&def, &[]).unwrap();
        assert_eq!(out[0].as_f32().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_given_tensor_fill_int64_exact() {
        let big = i64::MAX - 1;
        let def = OpBuilder::new("GivenTensorFill")
            .arg_ints("shape", vec![1])
            .arg_int("dtype", i64::from(DType::I64.tag()))
            .arg(Argument::ints("values", vec![big]))
            .build();
        let out = given_tensor_fill(&def, &[]).unwrap();
        assert_eq!(out[0].data(), &TensorData::I64(vec![big]));
    }

    #[test]
    fn test_given_tensor_fill_count_mismatch() {
        let def = OpBuilder::new("GivenTensorFill")
            .arg_ints("shape", vec![4])
            .arg_floats("values", vec![1.0])
            .build();
        assert!(given_tensor_fill(&def, &[]).is_err());
    }

    #[test]
    fn test_given_tensor_fill_requires_values() {
        let def = OpBuilder::new("GivenTensorFill").arg_ints("shape", vec![1]).build();
        assert!(matches!(
            given_tensor_fill(&def, &[]),
            Err(BackendError::InvalidOperator { .. })
        ));
    }

    #[test]
    fn test_constant_fill() {
        let def = OpBuilder::constant_fill("z", &[2, 2], DType::I32, 5.0).build();
        let out = constant_fill(&def, &[]).unwrap();
        assert_eq!(out[0].data(), &TensorData::I32(vec![5; 4]));
    }

    #[test]
    fn test_constant_fill_shape_from_input() {
        let like = Tensor::zeros(Shape::new(vec![3, 1]), DType::F32).unwrap();
        let def = OpBuilder::new("ConstantFill").arg_float("value", 1.5).build();
        let out = constant_fill(&def, &[&like]).unwrap();
        assert_eq!(out[0].shape(), like.shape());
        assert_eq!(out[0].as_f32().unwrap(), &[1.5; 3]);
    }

    #[test]
    fn test_fill_shapes_that_overflow_are_errors() {
        let overflowing = OpBuilder::constant_fill("c", &[1, 1 << 33, 1 << 33], DType::F32, 1.0).build();
        assert!(matches!(
            constant_fill(&overflowing, &[]),
            Err(BackendError::Tensor(TensorError::InvalidShape(_)))
        ));

        let too_large = OpBuilder::constant_fill("c", &[1, i64::MAX], DType::F32, 1.0).build();
        assert!(matches!(
            constant_fill(&too_large, &[]),
            Err(BackendError::Tensor(TensorError::AllocationFailed { .. }))
        ));

        let given = OpBuilder::new("GivenTensorFill")
            .arg_ints("shape", vec![1 << 40, 1 << 40])
            .arg(Argument::bytes("values", vec![0; 4]))
            .build();
        assert!(given_tensor_fill(&given, &[]).is_err());
    }
}
