// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Name and index bookkeeping for inputs and outputs.
//!
//! Indices are dense and assigned in registration (inputs) or discovery
//! (outputs) order. Shape, dtype and element width are keyed by name, so a
//! tensor that is both an input and an output shares one record.

use crate::RuntimeError;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use tensor_core::DType;

#[derive(Debug)]
struct Slot {
    name: String,
    c_name: CString,
}

impl Slot {
    fn new(name: &str) -> Result<Self, RuntimeError> {
        let c_name = CString::new(name).map_err(|_| RuntimeError::InvalidName(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            c_name,
        })
    }
}

/// Metadata recorded for one output during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputInfo {
    pub name: String,
    pub dims: Vec<i64>,
    pub dtype: DType,
}

/// Input and output bindings of one context.
#[derive(Debug, Default)]
pub struct BindingTable {
    inputs: Vec<Slot>,
    outputs: Vec<Slot>,
    dims: HashMap<String, Vec<i64>>,
    dtypes: HashMap<String, DType>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an input and returns its index.
    pub fn register_input(
        &mut self,
        name: &str,
        dims: Vec<i64>,
        dtype: DType,
    ) -> Result<usize, RuntimeError> {
        if self.input_index(name).is_some() {
            return Err(RuntimeError::DuplicateInput(name.to_string()));
        }
        let slot = Slot::new(name)?;
        self.inputs.push(slot);
        self.dims.insert(name.to_string(), dims);
        self.dtypes.insert(name.to_string(), dtype);
        Ok(self.inputs.len() - 1)
    }

    /// Replaces the output bindings with `outputs`, in order.
    ///
    /// Either every output is recorded or none is.
    pub fn commit_outputs(&mut self, outputs: Vec<OutputInfo>) -> Result<(), RuntimeError> {
        let slots = outputs
            .iter()
            .map(|o| Slot::new(&o.name))
            .collect::<Result<Vec<_>, _>>()?;
        for info in outputs {
            self.dims.insert(info.name.clone(), info.dims);
            self.dtypes.insert(info.name, info.dtype);
        }
        self.outputs = slots;
        Ok(())
    }

    /// Drops every output binding.
    pub fn clear_outputs(&mut self) {
        for slot in std::mem::take(&mut self.outputs) {
            if self.input_index(&slot.name).is_none() {
                self.dims.remove(&slot.name);
                self.dtypes.remove(&slot.name);
            }
        }
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input_name(&self, index: usize) -> Option<&str> {
        self.inputs.get(index).map(|s| s.name.as_str())
    }

    pub fn output_name(&self, index: usize) -> Option<&str> {
        self.outputs.get(index).map(|s| s.name.as_str())
    }

    /// NUL-terminated input name, valid as long as the table lives.
    pub fn input_c_name(&self, index: usize) -> Option<&CStr> {
        self.inputs.get(index).map(|s| s.c_name.as_c_str())
    }

    /// NUL-terminated output name, valid as long as the table lives.
    pub fn output_c_name(&self, index: usize) -> Option<&CStr> {
        self.outputs.get(index).map(|s| s.c_name.as_c_str())
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|s| s.name == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|s| s.name == name)
    }

    /// Input names in index order.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|s| s.name.as_str())
    }

    /// Last recorded shape of `name`.
    pub fn dims(&self, name: &str) -> Option<&[i64]> {
        self.dims.get(name).map(Vec::as_slice)
    }

    /// Overwrites the recorded shape of a known tensor.
    pub fn set_dims(&mut self, name: &str, dims: Vec<i64>) {
        if let Some(slot) = self.dims.get_mut(name) {
            *slot = dims;
        }
    }

    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.dtypes.get(name).copied()
    }

    /// Element width in bytes.
    pub fn itemsize(&self, name: &str) -> Option<usize> {
        self.dtype(name).map(DType::size_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(name: &str, dims: &[i64]) -> OutputInfo {
        OutputInfo {
            name: name.into(),
            dims: dims.to_vec(),
            dtype: DType::F32,
        }
    }

    #[test]
    fn test_register_assigns_dense_indices() {
        let mut t = BindingTable::new();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            assert_eq!(t.register_input(name, vec![1, 2], DType::F32).unwrap(), i);
        }
        assert_eq!(t.input_count(), 3);
        assert_eq!(t.input_name(1), Some("b"));
        assert_eq!(t.input_c_name(2).unwrap().to_str().unwrap(), "c");
        assert_eq!(t.input_name(3), None);
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut t = BindingTable::new();
        t.register_input("x", vec![1], DType::U8).unwrap();
        assert!(matches!(
            t.register_input("x", vec![1], DType::U8),
            Err(RuntimeError::DuplicateInput(_))
        ));
        assert_eq!(t.input_count(), 1);
    }

    #[test]
    fn test_register_rejects_nul() {
        let mut t = BindingTable::new();
        assert!(matches!(
            t.register_input("a\0b", vec![1], DType::U8),
            Err(RuntimeError::InvalidName(_))
        ));
        assert_eq!(t.input_count(), 0);
        assert!(t.dims("a\0b").is_none());
    }

    #[test]
    fn test_commit_and_clear_outputs() {
        let mut t = BindingTable::new();
        t.register_input("x", vec![1, 4], DType::F32).unwrap();
        t.commit_outputs(vec![out("y", &[1, 2]), out("z", &[3])]).unwrap();
        assert_eq!(t.output_index("z"), Some(1));
        assert_eq!(t.dims("y"), Some(&[1, 2][..]));
        assert_eq!(t.itemsize("y"), Some(4));

        t.clear_outputs();
        assert_eq!(t.output_count(), 0);
        assert!(t.dims("y").is_none());
        assert_eq!(t.dims("x"), Some(&[1, 4][..]));
    }

    #[test]
    fn test_passthrough_output_shares_record() {
        let mut t = BindingTable::new();
        t.register_input("x", vec![1, 4], DType::F32).unwrap();
        t.commit_outputs(vec![out("x", &[1, 4])]).unwrap();
        t.set_dims("x", vec![2, 4]);
        assert_eq!(t.dims("x"), Some(&[2, 4][..]));

        t.clear_outputs();
        assert_eq!(t.dims("x"), Some(&[2, 4][..]));
        assert_eq!(t.input_count(), 1);
    }

    #[test]
    fn test_set_dims_ignores_unknown() {
        let mut t = BindingTable::new();
        t.set_dims("nope", vec![1]);
        assert!(t.dims("nope").is_none());
    }
}
