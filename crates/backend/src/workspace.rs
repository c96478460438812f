// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named tensor store.
//!
//! A [`Workspace`] owns every blob a context creates. Blobs live as long as
//! the workspace; nets read and write them by name.

use crate::{BackendError, DeviceTensor};
use graph_ir::DeviceType;
use std::borrow::Cow;
use std::collections::HashMap;
use tensor_core::{DType, Shape, Tensor};

/// Where a blob's tensor currently lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    Host(Tensor),
    Accelerator(DeviceTensor),
}

impl Storage {
    /// Places `tensor` on `device`, uploading when needed.
    pub fn on(device: DeviceType, tensor: Tensor) -> Self {
        match device {
            DeviceType::Host => Storage::Host(tensor),
            DeviceType::Accelerator => Storage::Accelerator(DeviceTensor::upload(&tensor, 0)),
        }
    }

    pub fn device(&self) -> DeviceType {
        match self {
            Storage::Host(_) => DeviceType::Host,
            Storage::Accelerator(_) => DeviceType::Accelerator,
        }
    }
}

/// A named slot in the workspace, possibly empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blob {
    storage: Option<Storage>,
}

impl Blob {
    /// Returns `true` if no tensor was ever stored.
    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
    }

    /// Replaces the blob contents.
    pub fn set(&mut self, storage: Storage) {
        self.storage = Some(storage);
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    /// Shape of the stored tensor, read without a device download.
    pub fn shape(&self) -> Option<&Shape> {
        match self.storage.as_ref()? {
            Storage::Host(t) => Some(t.shape()),
            Storage::Accelerator(d) => Some(d.shape()),
        }
    }

    /// Dtype of the stored tensor, read without a device download.
    pub fn dtype(&self) -> Option<DType> {
        match self.storage.as_ref()? {
            Storage::Host(t) => Some(t.dtype()),
            Storage::Accelerator(d) => Some(d.dtype()),
        }
    }

    /// Byte size of the stored tensor.
    pub fn size_bytes(&self) -> Option<usize> {
        match self.storage.as_ref()? {
            Storage::Host(t) => Some(t.size_bytes()),
            Storage::Accelerator(d) => Some(d.size_bytes()),
        }
    }

    /// Returns the tensor in host memory.
    ///
    /// Host tensors are borrowed; accelerator tensors are downloaded
    /// synchronously into a fresh host tensor.
    pub fn to_host(&self, name: &str) -> Result<Cow<'_, Tensor>, BackendError> {
        match &self.storage {
            Some(Storage::Host(t)) => Ok(Cow::Borrowed(t)),
            Some(Storage::Accelerator(d)) => Ok(Cow::Owned(d.to_host()?)),
            None => Err(BackendError::EmptyBlob(name.to_string())),
        }
    }
}

/// A name → blob map.
#[derive(Debug, Default)]
pub struct Workspace {
    blobs: HashMap<String, Blob>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the blob `name`, creating an empty one if absent.
    pub fn create_blob(&mut self, name: &str) -> &mut Blob {
        self.blobs.entry(name.to_string()).or_default()
    }

    pub fn has_blob(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    pub fn blob(&self, name: &str) -> Option<&Blob> {
        self.blobs.get(name)
    }

    pub fn blob_mut(&mut self, name: &str) -> Option<&mut Blob> {
        self.blobs.get_mut(name)
    }

    /// Returns the blob `name` or a [`BackendError::MissingBlob`].
    pub fn get(&self, name: &str) -> Result<&Blob, BackendError> {
        self.blob(name)
            .ok_or_else(|| BackendError::MissingBlob(name.to_string()))
    }

    /// Number of blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Blob names in sorted order.
    pub fn blob_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blobs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
