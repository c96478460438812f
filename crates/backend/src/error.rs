// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the execution backend.

use tensor_core::TensorError;

/// Errors raised while building or running nets.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A tensor-level failure (shape, size or dtype).
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// No kernel is registered for an operator type.
    #[error("no operator registered for type '{0}'")]
    UnknownOperator(String),

    /// An operator reads a blob that was never created.
    #[error("blob '{0}' does not exist")]
    MissingBlob(String),

    /// An operator reads a blob that holds no tensor yet.
    #[error("blob '{0}' holds no tensor")]
    EmptyBlob(String),

    /// An operator definition is malformed (arity, arguments, dtypes).
    #[error("invalid operator '{op}': {detail}")]
    InvalidOperator { op: String, detail: String },

    /// A kernel failed while running; `op` names the operator.
    #[error("operator '{op}' failed: {source}")]
    OperatorFailed {
        op: String,
        #[source]
        source: Box<BackendError>,
    },
}
