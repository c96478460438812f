// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::Shape;

/// Errors that can occur while building, decoding or computing on tensors.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for {op}")]
    UnsupportedDType {
        op: &'static str,
        dtype: crate::DType,
    },

    /// The element-type tag is not present in the registry.
    #[error("unknown dtype tag {0}")]
    UnknownDType(i32),

    /// A shape could not be built (negative or overflowing dimensions).
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// The tensor is too large to allocate.
    #[error("cannot allocate a {dtype} tensor of shape {shape}")]
    AllocationFailed { shape: Shape, dtype: crate::DType },
}
