// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-ir
//!
//! The graph definitions the bridge loads and hands to the execution
//! backend.
//!
//! - [`proto`] — native net messages (`NetDef`, `OperatorDef`, `Argument`,
//!   `DeviceOption`), decoded with `prost`.
//! - [`onnx`] — the subset of the interchange format the converter reads.
//! - [`GraphPair`] — init + predict nets with a **type-state pattern**
//!   (`Parsed` → `Placed`).
//! - [`builder`] — fluent builders for assembling nets in code.
//!
//! # Example
//! ```
//! use graph_ir::builder::{NetBuilder, OpBuilder};
//! use graph_ir::{DeviceType, GraphPair};
//!
//! let init = NetBuilder::new("init").encode();
//! let predict = NetBuilder::new("predict")
//!     .external_input("x")
//!     .external_output("y")
//!     .op(OpBuilder::new("Relu").input("x").output("y"))
//!     .encode();
//!
//! let pair = GraphPair::from_native(&init, &predict).unwrap().place(DeviceType::Host);
//! assert_eq!(pair.external_outputs(), &["y".to_string()]);
//! ```

pub mod builder;
pub mod convert;
mod error;
pub mod graph;
pub mod onnx;
pub mod proto;

pub use error::GraphError;
pub use graph::{DeviceType, GraphPair, Parsed, Placed};
pub use proto::{Argument, DeviceOption, NetDef, OperatorDef};
