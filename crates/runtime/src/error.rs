// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the engine context.

use crate::EngineState;
use tensor_core::{DType, Shape};

/// Errors returned by [`EngineContext`](crate::EngineContext) operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A tensor could not be built, copied or converted.
    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),

    /// The serialized graphs could not be decoded or converted.
    #[error("graph error: {0}")]
    Graph(#[from] graph_ir::GraphError),

    /// The backend failed to build or run a net.
    #[error("backend error: {0}")]
    Backend(#[from] backend::BackendError),

    /// No binding exists under this name.
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },

    /// No binding exists at this index.
    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    /// The input name was registered twice.
    #[error("input '{0}' is already registered")]
    DuplicateInput(String),

    /// A registered input is not an external input of the prediction net.
    #[error("registered input '{0}' is not an external input of the graph")]
    NotInGraph(String),

    /// The operation is not allowed in the context's current state.
    #[error("{op} is not allowed in state {state}")]
    InvalidState {
        op: &'static str,
        state: EngineState,
    },

    /// A shape without a batch dimension was given.
    #[error("'{name}' needs a shape of rank >= 1")]
    MissingBatchDim { name: String },

    /// The per-item shape differs from the registered one.
    #[error("'{name}' expects per-item shape {expected}, got {actual}")]
    PerItemShape {
        name: String,
        expected: Shape,
        actual: Shape,
    },

    /// The element count does not divide into whole batch items.
    #[error("'{name}': {element_count} elements is not a positive multiple of {per_item}")]
    NotBatchMultiple {
        name: String,
        element_count: usize,
        per_item: usize,
    },

    /// A caller shape buffer has the wrong length.
    #[error("'{name}' has rank {expected}, shape buffer holds {actual}")]
    RankMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A caller output buffer cannot hold the tensor.
    #[error("'{name}' needs {needed} bytes, buffer holds {capacity}")]
    BufferTooSmall {
        name: String,
        needed: usize,
        capacity: usize,
    },

    /// A caller length cannot describe a buffer in this address space.
    #[error("{what} length {len} is too large")]
    LengthOverflow { what: &'static str, len: usize },

    /// The dtype cannot cross the boundary in this direction.
    #[error("unsupported dtype {dtype} for '{name}'")]
    UnsupportedDType { name: String, dtype: DType },

    /// The dtype can only be copied in on an accelerator context.
    #[error("dtype {dtype} for '{name}' requires an accelerator context")]
    AcceleratorOnly { name: String, dtype: DType },

    /// A name cannot be represented as a C string.
    #[error("name {0:?} contains an interior NUL byte")]
    InvalidName(String),

    /// An earlier initialize failed; the context is unusable.
    #[error("context faulted during initialize: {0}")]
    Faulted(String),

    /// A required ABI argument was null.
    #[error("null argument: {0}")]
    NullArgument(&'static str),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
