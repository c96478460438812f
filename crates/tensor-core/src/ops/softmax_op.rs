// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax activation operation.

use crate::{DType, Tensor, TensorError};

/// Computes softmax along the last dimension: `output[i] = exp(x[i] - max) / sum(exp(x - max))`.
///
/// Uses the numerically stable variant that subtracts the maximum value
/// before exponentiation to prevent overflow.
///
/// Both `input` and `output` must have the same shape and be `F32`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if input and output shapes differ.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn softmax(input: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op: "softmax",
            dtype: input.dtype(),
        });
    }

    if input.shape() != output.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "softmax",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }

    let src = input.as_f32()?;
    let dst = output.as_f32_mut()?;
    let last_dim = match input.shape().dims().last() {
        Some(&d) => d,
        None => {
            // Scalar: softmax of a single value is 1.0.
            dst.iter_mut().for_each(|d| *d = 1.0);
            return Ok(());
        }
    };
    if last_dim == 0 {
        return Ok(());
    }

    let num_rows = src.len() / last_dim;

    for row in 0..num_rows {
        let offset = row * last_dim;
        let row_src = &src[offset..offset + last_dim];
        let row_dst = &mut dst[offset..offset + last_dim];

        // Find max for numerical stability.
        let max_val = row_src.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        // Compute exp(x - max) and sum.
        let mut sum = 0.0f32;
        for (d, &s) in row_dst.iter_mut().zip(row_src.iter()) {
            let e = (s - max_val).exp();
            *d = e;
            sum += e;
        }

        // Normalize.
        if sum > 0.0 {
            let inv_sum = 1.0 / sum;
            for d in row_dst.iter_mut() {
                *d *= inv_sum;
            }
        }
    }

    Ok(())
}
