// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-type tags and the dtype registry.
//!
//! Tags are the integers callers pass across the ABI. Their numbering follows
//! the native graph format's tensor data-type enum; `U32` and `U64` extend it
//! past the last native value.
//!
//! The registry is a single table mapping each tag to its byte width and the
//! routine that turns a caller's raw bytes into a typed [`Tensor`]. `String`
//! is declared (so its tag round-trips through metadata) but has no copy
//! routine: every byte copy of a string tensor fails with
//! [`TensorError::UnsupportedDType`].

use crate::{Shape, Tensor, TensorData, TensorError};
use std::fmt;

/// Enumerates the element types a tensor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32 = 1,
    /// 32-bit signed integer.
    I32 = 2,
    /// Raw byte.
    Byte = 3,
    /// Variable-length string; declared but never copied.
    String = 4,
    /// Boolean stored as one byte.
    Bool = 5,
    /// 8-bit unsigned integer.
    U8 = 6,
    /// 8-bit signed integer.
    I8 = 7,
    /// 16-bit unsigned integer.
    U16 = 8,
    /// 16-bit signed integer.
    I16 = 9,
    /// 64-bit signed integer.
    I64 = 10,
    /// 16-bit IEEE 754 floating point (accelerator-only for copy-in).
    F16 = 12,
    /// 64-bit IEEE 754 floating point.
    F64 = 13,
    /// 32-bit unsigned integer.
    U32 = 16,
    /// 64-bit unsigned integer.
    U64 = 17,
}

impl DType {
    /// Every registered dtype, in tag order.
    pub const ALL: [DType; 14] = [
        DType::F32,
        DType::I32,
        DType::Byte,
        DType::String,
        DType::Bool,
        DType::U8,
        DType::I8,
        DType::U16,
        DType::I16,
        DType::I64,
        DType::F16,
        DType::F64,
        DType::U32,
        DType::U64,
    ];

    /// Returns the integer tag used at the ABI boundary.
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Resolves a tag, or `None` if the registry does not know it.
    pub fn from_tag(tag: i32) -> Option<Self> {
        REGISTRY.iter().find(|e| e.dtype.tag() == tag).map(|e| e.dtype)
    }

    /// Returns the size of a single element in bytes.
    ///
    /// `String` has no fixed width and reports 0.
    pub fn size_bytes(self) -> usize {
        self.entry().size_bytes
    }

    /// Returns `true` when host contexts must refuse to copy this dtype in.
    pub fn is_accelerator_only(self) -> bool {
        self.entry().accelerator_only
    }

    /// Returns `true` for the floating-point dtypes.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F16 | DType::F32 | DType::F64)
    }

    /// Returns the registry entry for this dtype.
    pub fn entry(self) -> &'static DTypeEntry {
        // Every variant has exactly one entry.
        REGISTRY
            .iter()
            .find(|e| e.dtype == self)
            .unwrap_or(&REGISTRY[0])
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "float32",
            DType::I32 => "int32",
            DType::Byte => "byte",
            DType::String => "string",
            DType::Bool => "bool",
            DType::U8 => "uint8",
            DType::I8 => "int8",
            DType::U16 => "uint16",
            DType::I16 => "int16",
            DType::I64 => "int64",
            DType::F16 => "float16",
            DType::F64 => "float64",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
        }
    }

    /// Parses a dtype name as written in configuration files.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "f32" | "float32" | "float" => Some(DType::F32),
            "i32" | "int32" => Some(DType::I32),
            "byte" => Some(DType::Byte),
            "string" | "str" => Some(DType::String),
            "bool" => Some(DType::Bool),
            "u8" | "uint8" => Some(DType::U8),
            "i8" | "int8" => Some(DType::I8),
            "u16" | "uint16" => Some(DType::U16),
            "i16" | "int16" => Some(DType::I16),
            "i64" | "int64" => Some(DType::I64),
            "f16" | "float16" | "half" => Some(DType::F16),
            "f64" | "float64" | "double" => Some(DType::F64),
            "u32" | "uint32" => Some(DType::U32),
            "u64" | "uint64" => Some(DType::U64),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns exactly `num_elements * size_bytes` little-endian bytes into typed storage.
pub type CopyFn = fn(&[u8]) -> TensorData;

/// One row of the dtype registry.
#[derive(Debug)]
pub struct DTypeEntry {
    /// The dtype this row describes.
    pub dtype: DType,
    /// Element width in bytes (0 for `String`).
    pub size_bytes: usize,
    /// Copy routine; `None` marks a declared but unsupported dtype.
    pub copy: Option<CopyFn>,
    /// Whether only accelerator contexts may copy this dtype in.
    pub accelerator_only: bool,
}

impl DTypeEntry {
    /// Copies `bytes` into a new tensor of `shape`.
    ///
    /// Validates that the byte count matches `shape` exactly before anything
    /// is allocated; a short or long buffer is an error, never a partial copy.
    pub fn copy_in(&self, shape: Shape, bytes: &[u8]) -> Result<Tensor, TensorError> {
        let copy = self.copy.ok_or(TensorError::UnsupportedDType {
            op: "copy",
            dtype: self.dtype,
        })?;
        let expected = shape
            .checked_size_bytes(self.dtype)
            .ok_or_else(|| TensorError::InvalidShape(format!("byte size of {shape} overflows")))?;
        if bytes.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Tensor::from_data(shape, copy(bytes))
    }
}

/// Looks up a tag in the registry.
///
/// # Errors
/// Returns [`TensorError::UnknownDType`] if the tag is not registered.
pub fn lookup(tag: i32) -> Result<&'static DTypeEntry, TensorError> {
    REGISTRY
        .iter()
        .find(|e| e.dtype.tag() == tag)
        .ok_or(TensorError::UnknownDType(tag))
}

fn collect<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    bytemuck::pod_collect_to_vec(bytes)
}

fn copy_f32(b: &[u8]) -> TensorData {
    TensorData::F32(collect(b))
}
fn copy_i32(b: &[u8]) -> TensorData {
    TensorData::I32(collect(b))
}
fn copy_byte(b: &[u8]) -> TensorData {
    TensorData::Byte(b.to_vec())
}
fn copy_bool(b: &[u8]) -> TensorData {
    TensorData::Bool(b.to_vec())
}
fn copy_u8(b: &[u8]) -> TensorData {
    TensorData::U8(b.to_vec())
}
fn copy_i8(b: &[u8]) -> TensorData {
    TensorData::I8(collect(b))
}
fn copy_u16(b: &[u8]) -> TensorData {
    TensorData::U16(collect(b))
}
fn copy_i16(b: &[u8]) -> TensorData {
    TensorData::I16(collect(b))
}
fn copy_i64(b: &[u8]) -> TensorData {
    TensorData::I64(collect(b))
}
fn copy_f16(b: &[u8]) -> TensorData {
    TensorData::F16(collect(b))
}
fn copy_f64(b: &[u8]) -> TensorData {
    TensorData::F64(collect(b))
}
fn copy_u32(b: &[u8]) -> TensorData {
    TensorData::U32(collect(b))
}
fn copy_u64(b: &[u8]) -> TensorData {
    TensorData::U64(collect(b))
}

static REGISTRY: [DTypeEntry; 14] = [
    DTypeEntry { dtype: DType::F32, size_bytes: 4, copy: Some(copy_f32), accelerator_only: false },
    DTypeEntry { dtype: DType::I32, size_bytes: 4, copy: Some(copy_i32), accelerator_only: false },
    DTypeEntry { dtype: DType::Byte, size_bytes: 1, copy: Some(copy_byte), accelerator_only: false },
    DTypeEntry { dtype: DType::String, size_bytes: 0, copy: None, accelerator_only: false },
    DTypeEntry { dtype: DType::Bool, size_bytes: 1, copy: Some(copy_bool), accelerator_only: false },
    DTypeEntry { dtype: DType::U8, size_bytes: 1, copy: Some(copy_u8), accelerator_only: false },
    DTypeEntry { dtype: DType::I8, size_bytes: 1, copy: Some(copy_i8), accelerator_only: false },
    DTypeEntry { dtype: DType::U16, size_bytes: 2, copy: Some(copy_u16), accelerator_only: false },
    DTypeEntry { dtype: DType::I16, size_bytes: 2, copy: Some(copy_i16), accelerator_only: false },
    DTypeEntry { dtype: DType::I64, size_bytes: 8, copy: Some(copy_i64), accelerator_only: false },
    DTypeEntry { dtype: DType::F16, size_bytes: 2, copy: Some(copy_f16), accelerator_only: true },
    DTypeEntry { dtype: DType::F64, size_bytes: 8, copy: Some(copy_f64), accelerator_only: false },
    DTypeEntry { dtype: DType::U32, size_bytes: 4, copy: Some(copy_u32), accelerator_only: false },
    DTypeEntry { dtype: DType::U64, size_bytes: 8, copy: Some(copy_u64), accelerator_only: false },
];
