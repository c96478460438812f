// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.

use crate::TensorError;
use std::fmt;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// The ABI speaks in signed 64-bit dimensions; internally dimensions are
/// `usize` and conversion happens once, at the edge, through
/// [`Shape::from_i64`] / [`Shape::to_i64`].
///
/// For batched tensors dimension 0 is the batch and the remaining dimensions
/// form the fixed per-item shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Builds a shape from ABI dimensions, rejecting negative values and
    /// dimensions whose element count does not fit in `usize`.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::from_i64(&[1, 3, 224, 224]).unwrap();
    /// assert_eq!(s.per_item().num_elements(), 3 * 224 * 224);
    /// assert!(Shape::from_i64(&[1, -1]).is_err());
    /// assert!(Shape::from_i64(&[1, 1 << 33, 1 << 33]).is_err());
    /// ```
    pub fn from_i64(dims: &[i64]) -> Result<Self, TensorError> {
        let shape = dims
            .iter()
            .map(|&d| {
                usize::try_from(d)
                    .map_err(|_| TensorError::InvalidShape(format!("negative dimension {d} in {dims:?}")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)?;
        if shape.checked_num_elements().is_none() {
            return Err(TensorError::InvalidShape(format!(
                "element count of {dims:?} overflows"
            )));
        }
        Ok(shape)
    }

    /// Returns the dimensions as ABI integers.
    pub fn to_i64(&self) -> Vec<i64> {
        self.dims.iter().map(|&d| d as i64).collect()
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1. Saturates at `usize::MAX`;
    /// use [`Shape::checked_num_elements`] where overflow must be reported.
    pub fn num_elements(&self) -> usize {
        self.checked_num_elements().unwrap_or(usize::MAX)
    }

    /// Returns the total number of elements, or `None` on overflow.
    pub fn checked_num_elements(&self) -> Option<usize> {
        if self.dims.contains(&0) {
            return Some(0);
        }
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Returns the batch dimension (dimension 0), or `None` for scalars.
    pub fn batch(&self) -> Option<usize> {
        self.dim(0)
    }

    /// Returns the per-item shape: every dimension after the batch.
    pub fn per_item(&self) -> Shape {
        Shape::new(self.dims.iter().skip(1).copied().collect())
    }

    /// Returns a copy of this shape with dimension 0 replaced by `batch`.
    ///
    /// A scalar shape becomes `[batch]`.
    pub fn with_batch(&self, batch: usize) -> Shape {
        let mut dims = self.dims.clone();
        match dims.first_mut() {
            Some(d) => *d = batch,
            None => dims.push(batch),
        }
        Shape::new(dims)
    }

    /// Computes the memory footprint in bytes for a given [`crate::DType`].
    ///
    /// Saturates at `usize::MAX`.
    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.checked_size_bytes(dtype).unwrap_or(usize::MAX)
    }

    /// Memory footprint in bytes, or `None` on overflow.
    pub fn checked_size_bytes(&self, dtype: super::DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
    }

    /// Returns `true` if two shapes are broadcast-compatible.
    ///
    /// Shapes are compatible when, aligning dimensions from the right,
    /// each pair is either equal or one of them is 1.
    pub fn is_broadcast_compatible(&self, other: &Shape) -> bool {
        let a = &self.dims;
        let b = &other.dims;
        let mut ai = a.len();
        let mut bi = b.len();
        while ai > 0 && bi > 0 {
            ai -= 1;
            bi -= 1;
            if a[ai] != b[bi] && a[ai] != 1 && b[bi] != 1 {
                return false;
            }
        }
        true
    }

    /// Returns `true` if the shapes are compatible for a matrix multiply:
    /// `self` is `[..., M, K]` and `other` is `[..., K, N]`.
    pub fn is_matmul_compatible(&self, other: &Shape) -> bool {
        if self.rank() < 2 || other.rank() < 2 {
            return false;
        }
        let k_lhs = self.dims[self.rank() - 1];
        let k_rhs = other.dims[other.rank() - 2];
        k_lhs == k_rhs
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert_eq!(s.batch(), None);
    }

    #[test]
    fn test_matrix_shape() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.rank(), 2);
        assert_eq!(s.num_elements(), 12);
        assert_eq!(s.size_bytes(DType::F32), 48);
    }

    #[test]
    fn test_per_item_and_batch() {
        let s = Shape::new(vec![8, 3, 224, 224]);
        assert_eq!(s.batch(), Some(8));
        assert_eq!(s.per_item(), Shape::new(vec![3, 224, 224]));
        assert_eq!(s.with_batch(1), Shape::new(vec![1, 3, 224, 224]));
        assert_eq!(Shape::vector(5).per_item(), Shape::scalar());
        assert_eq!(Shape::scalar().with_batch(2), Shape::vector(2));
    }

    #[test]
    fn test_i64_conversions() {
        let s = Shape::from_i64(&[2, 0, 7]).unwrap();
        assert_eq!(s.dims(), &[2, 0, 7]);
        assert_eq!(s.to_i64(), vec![2, 0, 7]);
        assert!(matches!(
            Shape::from_i64(&[4, -3]),
            Err(TensorError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_broadcast_compatible() {
        let a = Shape::new(vec![1, 3]);
        let b = Shape::new(vec![4, 3]);
        assert!(a.is_broadcast_compatible(&b));

        let c = Shape::new(vec![4, 1]);
        assert!(a.is_broadcast_compatible(&c));

        let d = Shape::new(vec![4, 2]);
        assert!(!a.is_broadcast_compatible(&d));
    }

    #[test]
    fn test_matmul_compatible() {
        let a = Shape::matrix(3, 4);
        let b = Shape::matrix(4, 5);
        assert!(a.is_matmul_compatible(&b));

        let c = Shape::matrix(5, 5);
        assert!(!a.is_matmul_compatible(&c));
    }

    #[test]
    fn test_display() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(format!("{s}"), "[2, 3, 4]");
    }

    #[test]
    fn test_size_bytes() {
        let s = Shape::new(vec![10, 20]);
        assert_eq!(s.size_bytes(DType::F32), 800);
        assert_eq!(s.size_bytes(DType::F16), 400);
        assert_eq!(s.size_bytes(DType::I8), 200);
        assert_eq!(s.size_bytes(DType::U64), 1600);
    }

    #[test]
    fn test_from_i64_rejects_overflowing_element_count() {
        let err = Shape::from_i64(&[1, 1 << 33, 1 << 33]).unwrap_err();
        assert!(matches!(err, TensorError::InvalidShape(ref m) if m.contains("overflows")));
        // A zero dimension keeps the product at zero.
        assert_eq!(Shape::from_i64(&[0, i64::MAX, i64::MAX]).unwrap().num_elements(), 0);
    }

    #[test]
    fn test_checked_sizes() {
        let s = Shape::new(vec![usize::MAX / 2, 3]);
        assert_eq!(s.checked_num_elements(), None);
        assert_eq!(s.num_elements(), usize::MAX);

        let wide = Shape::new(vec![1, usize::MAX / 2]);
        assert!(wide.checked_num_elements().is_some());
        assert_eq!(wide.checked_size_bytes(DType::F32), None);
        assert_eq!(wide.size_bytes(DType::F32), usize::MAX);
        assert_eq!(wide.checked_size_bytes(DType::U8), Some(usize::MAX / 2));
    }
}
