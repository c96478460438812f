// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # backend
//!
//! A small reference execution backend: enough to load, place and run the
//! nets `graph-ir` produces, on the host or on a simulated accelerator.
//!
//! - [`Workspace`] / [`Blob`] — the named tensor store.
//! - [`DeviceTensor`] — accelerator-resident memory, downloaded explicitly.
//! - [`DeviceProbe`] — capability probe ([`HostOnly`], [`SimulatedAccelerator`]).
//! - [`Net`] — an operator sequence resolved against the [`OperatorRegistry`].
//! - [`global_init`] — process-wide, run-once registry construction.
//!
//! # Example
//! ```
//! use backend::{run_net_once, Workspace};
//! use graph_ir::builder::{NetBuilder, OpBuilder};
//! use tensor_core::DType;
//!
//! let net = NetBuilder::new("init")
//!     .op(OpBuilder::constant_fill("ones", &[2, 2], DType::F32, 1.0))
//!     .build();
//! let mut ws = Workspace::new();
//! run_net_once(&net, &mut ws).unwrap();
//! assert_eq!(ws.get("ones").unwrap().size_bytes(), Some(16));
//! ```

mod device;
mod error;
mod net;
mod ops;
mod workspace;

pub use device::{DeviceProbe, DeviceTensor, HostOnly, SimulatedAccelerator};
pub use error::BackendError;
pub use net::{run_net_once, Net};
pub use ops::{global_init, Kernel, OperatorRegistry};
pub use workspace::{Blob, Storage, Workspace};
