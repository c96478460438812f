// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph decoding, conversion and validation.

/// Errors that can occur when working with graph definitions.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The serialized bytes are not a valid protobuf message.
    #[error("failed to decode graph protobuf: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The interchange model carries no graph.
    #[error("interchange model has no graph")]
    MissingGraph,

    /// A net is structurally invalid.
    #[error("invalid net '{net}': {detail}")]
    InvalidNet { net: String, detail: String },

    /// An interchange operator has no native counterpart.
    #[error("unsupported interchange operator '{op_type}' (node '{node}')")]
    UnsupportedOp { op_type: String, node: String },

    /// An interchange attribute is missing or has an unsupported value.
    #[error("invalid attribute on node '{node}': {detail}")]
    InvalidAttribute { node: String, detail: String },

    /// An interchange tensor payload is malformed.
    #[error("invalid tensor '{name}': {detail}")]
    InvalidTensor { name: String, detail: String },

    /// An interchange element type has no native dtype.
    #[error("unknown interchange element type {0}")]
    UnknownElemType(i32),
}
