// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device copy strategies.
//!
//! A context picks one [`TensorCopy`] at creation. Copy-in goes through the
//! dtype registry first, so every size and dtype check runs before the
//! destination blob is touched. Copy-out always yields a host tensor.

use crate::RuntimeError;
use backend::{Blob, DeviceTensor, Storage};
use graph_ir::DeviceType;
use std::borrow::Cow;
use tensor_core::{DType, Shape, Tensor};

/// Moves tensors between caller memory and the context's device.
pub trait TensorCopy: Send + std::fmt::Debug {
    /// Device this strategy writes to.
    fn device(&self) -> DeviceType;

    /// Whether `dtype` may be copied in by this strategy.
    fn accepts(&self, dtype: DType) -> bool;

    /// Builds a tensor of `shape` from `bytes` and stores it in `blob`.
    ///
    /// On error `blob` is left as it was.
    fn copy_in(
        &self,
        name: &str,
        dtype: DType,
        shape: Shape,
        bytes: &[u8],
        blob: &mut Blob,
    ) -> Result<(), RuntimeError> {
        let entry = dtype.entry();
        if entry.copy.is_none() {
            return Err(RuntimeError::UnsupportedDType {
                name: name.to_string(),
                dtype,
            });
        }
        if !self.accepts(dtype) {
            return Err(RuntimeError::AcceleratorOnly {
                name: name.to_string(),
                dtype,
            });
        }
        let tensor = entry.copy_in(shape, bytes)?;
        tracing::debug!(
            tensor = name,
            %dtype,
            shape = %tensor.shape(),
            device = %self.device(),
            "copy in"
        );
        blob.set(self.store(tensor));
        Ok(())
    }

    /// Wraps a host tensor in this device's storage.
    fn store(&self, tensor: Tensor) -> Storage;

    /// Stages the blob's tensor in host memory.
    fn copy_out<'a>(&self, name: &str, blob: &'a Blob) -> Result<Cow<'a, Tensor>, RuntimeError> {
        if let Some(dtype) = blob.dtype().filter(|d| d.entry().copy.is_none()) {
            return Err(RuntimeError::UnsupportedDType {
                name: name.to_string(),
                dtype,
            });
        }
        Ok(blob.to_host(name)?)
    }
}

/// Copies into host memory. Rejects accelerator-only dtypes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCopy;

impl TensorCopy for HostCopy {
    fn device(&self) -> DeviceType {
        DeviceType::Host
    }

    fn accepts(&self, dtype: DType) -> bool {
        !dtype.is_accelerator_only()
    }

    fn store(&self, tensor: Tensor) -> Storage {
        Storage::Host(tensor)
    }
}

/// Uploads to accelerator `device_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceleratorCopy {
    pub device_id: i32,
}

impl TensorCopy for AcceleratorCopy {
    fn device(&self) -> DeviceType {
        DeviceType::Accelerator
    }

    fn accepts(&self, _dtype: DType) -> bool {
        true
    }

    fn store(&self, tensor: Tensor) -> Storage {
        Storage::Accelerator(DeviceTensor::upload(&tensor, self.device_id))
    }
}

/// The strategy for `device`.
pub fn strategy_for(device: DeviceType) -> Box<dyn TensorCopy> {
    match device {
        DeviceType::Host => Box::new(HostCopy),
        DeviceType::Accelerator => Box::new(AcceleratorCopy::default()),
    }
}
