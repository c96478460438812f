// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Element types, shapes and backend-native tensors shared by every layer of
//! the bridge.
//!
//! This crate provides:
//! - [`DType`] — the element-type tags understood at the ABI boundary, plus
//!   the [`registry`](dtype::lookup) mapping each tag to its byte width and
//!   decode routine.
//! - [`Shape`] — runtime shape descriptors with batch/per-item helpers.
//! - [`Tensor`] — an owned, typed, contiguous tensor whose raw bytes can be
//!   exposed without reinterpretation across width boundaries.
//! - A few f32 kernels (`matmul`, `matmul_transposed`, `softmax`) used by the reference
//!   execution backend.
//!
//! # Design Goals
//! - Every byte buffer crossing the boundary is decoded through a single
//!   dispatch table, so "unsupported dtype" is one fallthrough.
//! - No `unsafe`: typed storage is cast to bytes with `bytemuck`.
//! - Clean error types via `thiserror`.

pub mod dtype;
mod error;
mod ops;
mod shape;
mod tensor;

pub use dtype::{lookup, DType, DTypeEntry};
pub use error::TensorError;
pub use ops::{matmul, matmul_transposed, softmax};
pub use shape::Shape;
pub use tensor::{Tensor, TensorData};
