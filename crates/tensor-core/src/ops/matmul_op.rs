// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix multiplication operations.

use crate::{DType, Shape, Tensor, TensorError};

/// Performs matrix multiplication: `output = lhs @ rhs`.
///
/// Both inputs must be 2-D `F32` tensors with compatible inner dimensions:
/// `lhs` is `[M, K]`, `rhs` is `[K, N]`, and `output` must be `[M, N]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible.
/// Returns [`TensorError::UnsupportedDType`] if a dtype is not `F32`.
pub fn matmul(lhs: &Tensor, rhs: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    check_f32("matmul", lhs, rhs)?;
    if lhs.shape().rank() != 2
        || rhs.shape().rank() != 2
        || !lhs.shape().is_matmul_compatible(rhs.shape())
    {
        return Err(TensorError::ShapeMismatch {
            op: "matmul",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }
    let (m, k) = (lhs.shape().dims()[0], lhs.shape().dims()[1]);
    let n = rhs.shape().dims()[1];
    check_output("matmul (output)", output, m, n)?;

    let a = lhs.as_f32()?;
    let b = rhs.as_f32()?;
    let c = output.as_f32_mut()?;
    matmul_f32_generic(a, b, c, m, k, n);
    Ok(())
}

/// Multiplies by the transpose of `rhs`: `output = lhs @ rhs^T`.
///
/// `lhs` is `[M, K]`, `rhs` is `[N, K]` (row-major, one row per output
/// column), and `output` must be `[M, N]`. This is the layout fully-connected
/// weights are stored in.
pub fn matmul_transposed(
    lhs: &Tensor,
    rhs: &Tensor,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    check_f32("matmul_transposed", lhs, rhs)?;
    let ld = lhs.shape().dims();
    let rd = rhs.shape().dims();
    if ld.len() != 2 || rd.len() != 2 || ld[1] != rd[1] {
        return Err(TensorError::ShapeMismatch {
            op: "matmul_transposed",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }
    let (m, k, n) = (ld[0], ld[1], rd[0]);
    check_output("matmul_transposed (output)", output, m, n)?;

    let a = lhs.as_f32()?;
    let b = rhs.as_f32()?;
    let c = output.as_f32_mut()?;
    for i in 0..m {
        let a_row = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let b_row = &b[j * k..(j + 1) * k];
            c[i * n + j] = a_row.iter().zip(b_row).map(|(x, y)| x * y).sum();
        }
    }
    Ok(())
}

fn check_f32(op: &'static str, lhs: &Tensor, rhs: &Tensor) -> Result<(), TensorError> {
    for t in [lhs, rhs] {
        if t.dtype() != DType::F32 {
            return Err(TensorError::UnsupportedDType { op, dtype: t.dtype() });
        }
    }
    Ok(())
}

fn check_output(op: &'static str, output: &Tensor, m: usize, n: usize) -> Result<(), TensorError> {
    let expected = Shape::matrix(m, n);
    if output.shape() != &expected || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }
    Ok(())
}

/// Generic (portable) f32 matrix multiplication.
///
/// Uses a simple ikj loop order for better cache locality on the `b` matrix.
fn matmul_f32_generic(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    c.iter_mut().for_each(|x| *x = 0.0);

    // The inner loop is a saxpy on a row of C, sequential in memory.
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            let c_row = &mut c[i * n..(i + 1) * n];
            let b_row = &b[p * n..(p + 1) * n];
            for j in 0..n {
                c_row[j] += a_ip * b_row[j];
            }
        }
    }
}
