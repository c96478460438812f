// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! f32 kernels used by the reference execution backend.
//!
//! Each operation writes into a pre-allocated output tensor whose shape and
//! dtype are validated before any element is touched.

mod matmul_op;
mod softmax_op;

pub use matmul_op::{matmul, matmul_transposed};
pub use softmax_op::softmax;
