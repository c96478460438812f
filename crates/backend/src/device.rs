// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Accelerator memory and the device capability probe.
//!
//! The reference backend has no real accelerator. [`DeviceTensor`] models
//! device-resident memory as an opaque byte arena: its metadata is readable
//! in place, but its contents are only reachable through an explicit,
//! synchronous [`DeviceTensor::to_host`] download.

use tensor_core::{DType, Shape, Tensor, TensorError};

// ── DeviceTensor ───────────────────────────────────────────────────

/// A tensor resident in (simulated) accelerator memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTensor {
    shape: Shape,
    dtype: DType,
    device_id: i32,
    memory: Box<[u8]>,
}

impl DeviceTensor {
    /// Uploads a host tensor to device `device_id`.
    pub fn upload(tensor: &Tensor, device_id: i32) -> Self {
        Self {
            shape: tensor.shape().clone(),
            dtype: tensor.dtype(),
            device_id,
            memory: tensor.as_bytes().into(),
        }
    }

    /// Downloads the contents into a new host tensor.
    pub fn to_host(&self) -> Result<Tensor, TensorError> {
        Tensor::from_bytes(self.shape.clone(), self.dtype, &self.memory)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device_id(&self) -> i32 {
        self.device_id
    }

    /// Size of the device allocation in bytes.
    pub fn size_bytes(&self) -> usize {
        self.memory.len()
    }
}

// ── DeviceProbe ────────────────────────────────────────────────────

/// Answers "how many accelerators are present?".
///
/// Contexts consult a probe exactly once, at creation, to decide whether an
/// accelerator request can be honored.
pub trait DeviceProbe: Send + Sync {
    /// Number of usable accelerators.
    fn accelerator_count(&self) -> usize;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// A machine without accelerators. The default probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostOnly;

impl DeviceProbe for HostOnly {
    fn accelerator_count(&self) -> usize {
        0
    }

    fn name(&self) -> &'static str {
        "host-only"
    }
}

/// Reports `count` accelerators backed by [`DeviceTensor`] memory.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedAccelerator {
    pub count: usize,
}

impl DeviceProbe for SimulatedAccelerator {
    fn accelerator_count(&self) -> usize {
        self.count
    }

    fn name(&self) -> &'static str {
        "simulated-accelerator"
    }
}
