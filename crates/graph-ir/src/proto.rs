// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Native graph messages.
//!
//! Wire-compatible with the subset of the native net schema the bridge
//! consumes. Field numbers must not change.

/// Device type value for host execution.
pub const DEVICE_HOST: i32 = 0;
/// Device type value for accelerator execution.
pub const DEVICE_ACCELERATOR: i32 = 1;

/// A whole network: an ordered operator list plus its external interface.
#[derive(Clone, PartialEq, prost::Message)]
pub struct NetDef {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub op: Vec<OperatorDef>,
    #[prost(string, tag = "3")]
    pub r#type: String,
    #[prost(int32, tag = "4")]
    pub num_workers: i32,
    #[prost(message, optional, tag = "5")]
    pub device_option: Option<DeviceOption>,
    #[prost(message, repeated, tag = "6")]
    pub arg: Vec<Argument>,
    #[prost(string, repeated, tag = "7")]
    pub external_input: Vec<String>,
    #[prost(string, repeated, tag = "8")]
    pub external_output: Vec<String>,
}

/// One operator invocation inside a [`NetDef`].
#[derive(Clone, PartialEq, prost::Message)]
pub struct OperatorDef {
    #[prost(string, repeated, tag = "1")]
    pub input: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub output: Vec<String>,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub r#type: String,
    #[prost(message, repeated, tag = "5")]
    pub arg: Vec<Argument>,
    #[prost(message, optional, tag = "6")]
    pub device_option: Option<DeviceOption>,
    #[prost(string, tag = "7")]
    pub engine: String,
}

/// A named operator argument. Exactly one value field is normally set.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Argument {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(float, optional, tag = "2")]
    pub f: Option<f32>,
    #[prost(int64, optional, tag = "3")]
    pub i: Option<i64>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub s: Option<Vec<u8>>,
    #[prost(float, repeated, tag = "5")]
    pub floats: Vec<f32>,
    #[prost(int64, repeated, tag = "6")]
    pub ints: Vec<i64>,
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub strings: Vec<Vec<u8>>,
}

/// Where an operator (or a whole net) runs.
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct DeviceOption {
    #[prost(int32, tag = "1")]
    pub device_type: i32,
    #[prost(int32, tag = "2")]
    pub device_id: i32,
}

impl Argument {
    /// Builds a float argument.
    pub fn float(name: &str, value: f32) -> Self {
        Self {
            name: name.to_string(),
            f: Some(value),
            ..Default::default()
        }
    }

    /// Builds an integer argument.
    pub fn int(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            i: Some(value),
            ..Default::default()
        }
    }

    /// Builds a bytes argument.
    pub fn bytes(name: &str, value: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            s: Some(value),
            ..Default::default()
        }
    }

    /// Builds a float-list argument.
    pub fn floats(name: &str, values: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            floats: values,
            ..Default::default()
        }
    }

    /// Builds an integer-list argument.
    pub fn ints(name: &str, values: Vec<i64>) -> Self {
        Self {
            name: name.to_string(),
            ints: values,
            ..Default::default()
        }
    }
}

impl OperatorDef {
    /// Finds an argument by name.
    pub fn arg(&self, name: &str) -> Option<&Argument> {
        self.arg.iter().find(|a| a.name == name)
    }

    /// Returns the integer argument `name`, if present.
    pub fn arg_int(&self, name: &str) -> Option<i64> {
        self.arg(name).and_then(|a| a.i)
    }

    /// Returns the float argument `name`, if present.
    pub fn arg_float(&self, name: &str) -> Option<f32> {
        self.arg(name).and_then(|a| a.f)
    }

    /// Returns the bytes argument `name`, if present.
    pub fn arg_bytes(&self, name: &str) -> Option<&[u8]> {
        self.arg(name).and_then(|a| a.s.as_deref())
    }

    /// Returns the integer-list argument `name`, if present.
    pub fn arg_ints(&self, name: &str) -> Option<&[i64]> {
        self.arg(name).map(|a| a.ints.as_slice())
    }

    /// Returns the float-list argument `name`, if present.
    pub fn arg_floats(&self, name: &str) -> Option<&[f32]> {
        self.arg(name).map(|a| a.floats.as_slice())
    }

    /// A label for logs and errors: the operator name, or its type.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.r#type
        } else {
            &self.name
        }
    }
}
