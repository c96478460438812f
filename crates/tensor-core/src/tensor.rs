// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and its typed storage.

use crate::{dtype, DType, Shape, TensorError};
use half::f16;

/// Typed, contiguous element storage.
///
/// One variant per copyable [`DType`]. Storage is always a properly aligned
/// `Vec<T>`, so byte views are produced with `bytemuck` and never require
/// reinterpretation of a misaligned buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    F16(Vec<f16>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    Byte(Vec<u8>),
    Bool(Vec<u8>),
}

impl TensorData {
    /// Returns the dtype of this storage.
    pub fn dtype(&self) -> DType {
        match self {
            TensorData::F32(_) => DType::F32,
            TensorData::F16(_) => DType::F16,
            TensorData::F64(_) => DType::F64,
            TensorData::I8(_) => DType::I8,
            TensorData::I16(_) => DType::I16,
            TensorData::I32(_) => DType::I32,
            TensorData::I64(_) => DType::I64,
            TensorData::U8(_) => DType::U8,
            TensorData::U16(_) => DType::U16,
            TensorData::U32(_) => DType::U32,
            TensorData::U64(_) => DType::U64,
            TensorData::Byte(_) => DType::Byte,
            TensorData::Bool(_) => DType::Bool,
        }
    }

    /// Returns the number of elements stored.
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::F16(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::I8(v) => v.len(),
            TensorData::I16(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::U8(v) | TensorData::Byte(v) | TensorData::Bool(v) => v.len(),
            TensorData::U16(v) => v.len(),
            TensorData::U32(v) => v.len(),
            TensorData::U64(v) => v.len(),
        }
    }

    /// Returns `true` when no elements are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the little-endian bytes of the storage.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TensorData::F32(v) => bytemuck::cast_slice(v),
            TensorData::F16(v) => bytemuck::cast_slice(v),
            TensorData::F64(v) => bytemuck::cast_slice(v),
            TensorData::I8(v) => bytemuck::cast_slice(v),
            TensorData::I16(v) => bytemuck::cast_slice(v),
            TensorData::I32(v) => bytemuck::cast_slice(v),
            TensorData::I64(v) => bytemuck::cast_slice(v),
            TensorData::U8(v) | TensorData::Byte(v) | TensorData::Bool(v) => v.as_slice(),
            TensorData::U16(v) => bytemuck::cast_slice(v),
            TensorData::U32(v) => bytemuck::cast_slice(v),
            TensorData::U64(v) => bytemuck::cast_slice(v),
        }
    }

    /// Builds storage of `dtype` from `f64` values, converting with `as`
    /// semantics (saturating for integers, nonzero-is-true for bool).
    ///
    /// # Errors
    /// Returns [`TensorError::UnsupportedDType`] for `String`.
    pub fn from_f64(dtype: DType, values: &[f64]) -> Result<Self, TensorError> {
        let it = values.iter().copied();
        Ok(match dtype {
            DType::F32 => TensorData::F32(it.map(|v| v as f32).collect()),
            DType::F16 => TensorData::F16(it.map(f16::from_f64).collect()),
            DType::F64 => TensorData::F64(it.collect()),
            DType::I8 => TensorData::I8(it.map(|v| v as i8).collect()),
            DType::I16 => TensorData::I16(it.map(|v| v as i16).collect()),
            DType::I32 => TensorData::I32(it.map(|v| v as i32).collect()),
            DType::I64 => TensorData::I64(it.map(|v| v as i64).collect()),
            DType::U8 => TensorData::U8(it.map(|v| v as u8).collect()),
            DType::U16 => TensorData::U16(it.map(|v| v as u16).collect()),
            DType::U32 => TensorData::U32(it.map(|v| v as u32).collect()),
            DType::U64 => TensorData::U64(it.map(|v| v as u64).collect()),
            DType::Byte => TensorData::Byte(it.map(|v| v as u8).collect()),
            DType::Bool => TensorData::Bool(it.map(|v| u8::from(v != 0.0)).collect()),
            DType::String => {
                return Err(TensorError::UnsupportedDType {
                    op: "fill",
                    dtype,
                })
            }
        })
    }

    /// Widens every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            TensorData::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::F16(v) => v.iter().map(|x| x.to_f64()).collect(),
            TensorData::F64(v) => v.clone(),
            TensorData::I8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::I16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::I32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::I64(v) => v.iter().map(|&x| x as f64).collect(),
            TensorData::U8(v) | TensorData::Byte(v) | TensorData::Bool(v) => {
                v.iter().map(|&x| f64::from(x)).collect()
            }
            TensorData::U16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::U32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            TensorData::U64(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}

/// An owned, n-dimensional tensor stored in contiguous memory.
///
/// `Tensor` is the backend-native handle the execution layer stores in its
/// workspace and the unit every copy across the ABI produces or consumes.
///
/// # Memory Layout
/// Data is stored in row-major (C) order as a typed `Vec`; [`Tensor::as_bytes`]
/// exposes the same memory as little-endian bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: TensorData,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32).unwrap();
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    ///
    /// # Errors
    /// Returns [`TensorError::UnsupportedDType`] for `String`.
    pub fn zeros(shape: Shape, dtype: DType) -> Result<Self, TensorError> {
        Self::full(shape, dtype, 0.0)
    }

    /// Creates a tensor with every element set to `value` (converted to `dtype`).
    ///
    /// # Errors
    /// [`TensorError::AllocationFailed`] when the tensor cannot be allocated,
    /// including shapes whose byte size overflows.
    pub fn full(shape: Shape, dtype: DType, value: f64) -> Result<Self, TensorError> {
        let values = filled(&shape, dtype, value)?;
        let data = TensorData::from_f64(dtype, &values)?;
        Ok(Self { shape, data })
    }

    /// Little-endian bytes of an all-zero `dtype` tensor of `shape`.
    ///
    /// Fails like [`Tensor::full`] instead of aborting on huge shapes.
    pub fn zeroed_bytes(shape: &Shape, dtype: DType) -> Result<Vec<u8>, TensorError> {
        let len = shape
            .checked_size_bytes(dtype)
            .ok_or_else(|| alloc_failed(shape, dtype))?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| alloc_failed(shape, dtype))?;
        bytes.resize(len, 0);
        Ok(bytes)
    }

    /// Wraps typed storage, checking the element count against `shape`.
    pub fn from_data(shape: Shape, data: TensorData) -> Result<Self, TensorError> {
        if data.len() != shape.num_elements() {
            let width = data.dtype().size_bytes();
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.num_elements().saturating_mul(width),
                actual: data.len().saturating_mul(width),
            });
        }
        Ok(Self { shape, data })
    }

    /// Copies raw little-endian bytes into a new tensor.
    ///
    /// Goes through the dtype registry, so `String` fails with
    /// [`TensorError::UnsupportedDType`] and any length mismatch fails with
    /// [`TensorError::BufferSizeMismatch`].
    pub fn from_bytes(shape: Shape, dtype: DType, bytes: &[u8]) -> Result<Self, TensorError> {
        dtype::lookup(dtype.tag())?.copy_in(shape, bytes)
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32().unwrap(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_data(shape, TensorData::F32(values.to_vec()))
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    /// Returns the typed storage.
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Returns the number of elements.
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Returns the width of one element in bytes.
    pub fn itemsize(&self) -> usize {
        self.dtype().size_bytes()
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.num_elements() * self.itemsize()
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Borrows the elements as `f32`.
    ///
    /// # Errors
    /// Returns [`TensorError::UnsupportedDType`] unless the tensor is `F32`.
    pub fn as_f32(&self) -> Result<&[f32], TensorError> {
        match &self.data {
            TensorData::F32(v) => Ok(v.as_slice()),
            other => Err(TensorError::UnsupportedDType {
                op: "as_f32",
                dtype: other.dtype(),
            }),
        }
    }

    /// Mutably borrows the elements as `f32`.
    pub fn as_f32_mut(&mut self) -> Result<&mut [f32], TensorError> {
        match &mut self.data {
            TensorData::F32(v) => Ok(v.as_mut_slice()),
            other => Err(TensorError::UnsupportedDType {
                op: "as_f32_mut",
                dtype: other.dtype(),
            }),
        }
    }

    /// Returns a tensor with the same elements viewed under `shape`.
    ///
    /// # Errors
    /// Returns [`TensorError::ShapeMismatch`] if the element counts differ.
    pub fn reshape(self, shape: Shape) -> Result<Self, TensorError> {
        if shape.num_elements() != self.num_elements() {
            return Err(TensorError::ShapeMismatch {
                op: "reshape",
                lhs: self.shape,
                rhs: shape,
            });
        }
        Ok(Self {
            shape,
            data: self.data,
        })
    }

    /// Widens every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.to_f64_vec()
    }

    /// Converts every element to `dtype`, going through `f64`.
    ///
    /// 64-bit integers above 2^53 lose precision; same-dtype casts are exact.
    pub fn cast(&self, dtype: DType) -> Result<Self, TensorError> {
        if dtype == self.dtype() {
            return Ok(self.clone());
        }
        let data = TensorData::from_f64(dtype, &self.to_f64_vec())?;
        Ok(Self {
            shape: self.shape.clone(),
            data,
        })
    }
}

fn alloc_failed(shape: &Shape, dtype: DType) -> TensorError {
    TensorError::AllocationFailed {
        shape: shape.clone(),
        dtype,
    }
}

/// `shape.num_elements()` copies of `value`, allocated fallibly.
fn filled(shape: &Shape, dtype: DType, value: f64) -> Result<Vec<f64>, TensorError> {
    let n = shape
        .checked_size_bytes(dtype)
        .and(shape.checked_num_elements())
        .ok_or_else(|| alloc_failed(shape, dtype))?;
    let mut values = Vec::new();
    values
        .try_reserve_exact(n)
        .map_err(|_| alloc_failed(shape, dtype))?;
    values.resize(n, value);
    Ok(values)
}
