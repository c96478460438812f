// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fluent builders for native nets.
//!
//! Used by tests, benches and the CLI to assemble graphs without hand-writing
//! protobuf structs.
//!
//! # Examples
//! ```
//! use graph_ir::builder::{NetBuilder, OpBuilder};
//!
//! let net = NetBuilder::new("predict")
//!     .external_input("x")
//!     .external_output("y")
//!     .op(OpBuilder::new("Relu").input("x").output("y"))
//!     .build();
//! assert_eq!(net.op.len(), 1);
//! ```

use crate::proto::{Argument, NetDef, OperatorDef};
use prost::Message;
use tensor_core::{DType, Tensor};

/// Builds a [`NetDef`].
#[derive(Debug, Default)]
pub struct NetBuilder {
    net: NetDef,
}

impl NetBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            net: NetDef {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn external_input(mut self, name: &str) -> Self {
        self.net.external_input.push(name.to_string());
        self
    }

    pub fn external_output(mut self, name: &str) -> Self {
        self.net.external_output.push(name.to_string());
        self
    }

    pub fn op(mut self, op: OpBuilder) -> Self {
        self.net.op.push(op.build());
        self
    }

    pub fn build(self) -> NetDef {
        self.net
    }

    /// Builds and serializes the net.
    pub fn encode(self) -> Vec<u8> {
        self.net.encode_to_vec()
    }
}

/// Builds an [`OperatorDef`].
#[derive(Debug, Default)]
pub struct OpBuilder {
    op: OperatorDef,
}

impl OpBuilder {
    pub fn new(op_type: &str) -> Self {
        Self {
            op: OperatorDef {
                r#type: op_type.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.op.name = name.to_string();
        self
    }

    pub fn input(mut self, name: &str) -> Self {
        self.op.input.push(name.to_string());
        self
    }

    pub fn output(mut self, name: &str) -> Self {
        self.op.output.push(name.to_string());
        self
    }

    pub fn arg(mut self, arg: Argument) -> Self {
        self.op.arg.push(arg);
        self
    }

    pub fn arg_int(self, name: &str, value: i64) -> Self {
        self.arg(Argument::int(name, value))
    }

    pub fn arg_float(self, name: &str, value: f32) -> Self {
        self.arg(Argument::float(name, value))
    }

    pub fn arg_ints(self, name: &str, values: Vec<i64>) -> Self {
        self.arg(Argument::ints(name, values))
    }

    pub fn arg_floats(self, name: &str, values: Vec<f32>) -> Self {
        self.arg(Argument::floats(name, values))
    }

    pub fn build(self) -> OperatorDef {
        self.op
    }

    /// A `GivenTensorFill` writing `tensor` into blob `output`.
    ///
    /// The payload is stored as raw little-endian bytes together with the
    /// dtype tag and shape, so every copyable dtype can be expressed.
    pub fn given_tensor_fill(output: &str, tensor: &Tensor) -> Self {
        Self::new("GivenTensorFill")
            .output(output)
            .arg_ints("shape", tensor.shape().to_i64())
            .arg_int("dtype", i64::from(tensor.dtype().tag()))
            .arg(Argument::bytes("values", tensor.as_bytes().to_vec()))
    }

    /// A `ConstantFill` writing a `shape` tensor of `value` into `output`.
    pub fn constant_fill(output: &str, shape: &[i64], dtype: DType, value: f32) -> Self {
        Self::new("ConstantFill")
            .output(output)
            .arg_ints("shape", shape.to_vec())
            .arg_int("dtype", i64::from(dtype.tag()))
            .arg_float("value", value)
    }
}
