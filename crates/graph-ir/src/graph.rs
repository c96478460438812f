// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The init/predict net pair.
//!
//! # Type-State Pattern
//!
//! ```text
//! GraphPair<Parsed>   — decoded and structurally checked.
//!       │  .place(device)
//!       ▼
//! GraphPair<Placed>   — every operator and both nets tagged with a device.
//! ```
//!
//! Only a placed pair can be handed to the execution backend, so an
//! operator can never run with a stale or missing device option.

use crate::onnx::ModelProto;
use crate::proto::{DeviceOption, NetDef, DEVICE_ACCELERATOR, DEVICE_HOST};
use crate::{convert, GraphError};
use prost::Message;
use std::fmt;

// ── Device ─────────────────────────────────────────────────────────

/// The device a placed graph executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Host,
    Accelerator,
}

impl DeviceType {
    /// Returns the device option tagging an operator with this device.
    pub fn to_option(self) -> DeviceOption {
        DeviceOption {
            device_type: match self {
                DeviceType::Host => DEVICE_HOST,
                DeviceType::Accelerator => DEVICE_ACCELERATOR,
            },
            device_id: 0,
        }
    }

    /// Reads the device from an optional device option. Absent means host.
    pub fn from_option(option: Option<&DeviceOption>) -> Self {
        match option {
            Some(o) if o.device_type == DEVICE_ACCELERATOR => DeviceType::Accelerator,
            _ => DeviceType::Host,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Host => write!(f, "host"),
            DeviceType::Accelerator => write!(f, "accelerator"),
        }
    }
}

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: nets decoded and validated, no device assigned yet.
#[derive(Debug, Clone)]
pub struct Parsed;

/// Marker: every operator carries the resolved device option.
#[derive(Debug, Clone)]
pub struct Placed;

/// Sealed trait for graph-pair states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Parsed {}
impl GraphState for Placed {}

// ── GraphPair ──────────────────────────────────────────────────────

/// The two nets a model consists of: `init` fills parameters once,
/// `predict` runs per batch.
#[derive(Debug, Clone)]
pub struct GraphPair<S: GraphState = Parsed> {
    init: NetDef,
    predict: NetDef,
    _state: std::marker::PhantomData<S>,
}

impl<S: GraphState> GraphPair<S> {
    /// The parameter-initialization net.
    pub fn init(&self) -> &NetDef {
        &self.init
    }

    /// The prediction net.
    pub fn predict(&self) -> &NetDef {
        &self.predict
    }

    /// External inputs declared by the prediction net, in declaration order.
    pub fn external_inputs(&self) -> &[String] {
        &self.predict.external_input
    }

    /// External outputs declared by the prediction net, in declaration order.
    pub fn external_outputs(&self) -> &[String] {
        &self.predict.external_output
    }

    /// Returns a one-line description.
    pub fn summary(&self) -> String {
        format!(
            "init '{}' ({} ops), predict '{}' ({} ops, {} inputs, {} outputs)",
            self.init.name,
            self.init.op.len(),
            self.predict.name,
            self.predict.op.len(),
            self.predict.external_input.len(),
            self.predict.external_output.len(),
        )
    }
}

// ── Parsed state ───────────────────────────────────────────────────

impl GraphPair<Parsed> {
    /// Wraps two nets after validating them.
    ///
    /// # Checks
    /// - The prediction net declares at least one external output.
    /// - Every operator in either net has a non-empty type.
    pub fn new(init: NetDef, predict: NetDef) -> Result<Self, GraphError> {
        for net in [&init, &predict] {
            if let Some((i, _)) = net.op.iter().enumerate().find(|(_, op)| op.r#type.is_empty()) {
                return Err(GraphError::InvalidNet {
                    net: net.name.clone(),
                    detail: format!("operator {i} has an empty type"),
                });
            }
        }
        if predict.external_output.is_empty() {
            return Err(GraphError::InvalidNet {
                net: predict.name.clone(),
                detail: "prediction net declares no external outputs".into(),
            });
        }
        Ok(Self {
            init,
            predict,
            _state: std::marker::PhantomData,
        })
    }

    /// Decodes the two native serialized nets.
    pub fn from_native(init_bytes: &[u8], predict_bytes: &[u8]) -> Result<Self, GraphError> {
        let init = NetDef::decode(init_bytes)?;
        let predict = NetDef::decode(predict_bytes)?;
        tracing::debug!(
            init_ops = init.op.len(),
            predict_ops = predict.op.len(),
            "decoded native nets"
        );
        Self::new(init, predict)
    }

    /// Decodes a serialized interchange model and converts it to native nets.
    pub fn from_interchange(model_bytes: &[u8]) -> Result<Self, GraphError> {
        let model = ModelProto::decode(model_bytes)?;
        let (init, predict) = convert::convert_model(&model)?;
        Self::new(init, predict)
    }

    /// Tags both nets and every operator with `device`.
    ///
    /// Any device option already present in the serialized graph is
    /// overwritten.
    pub fn place(mut self, device: DeviceType) -> GraphPair<Placed> {
        let option = device.to_option();
        for net in [&mut self.init, &mut self.predict] {
            net.device_option = Some(option);
            for op in &mut net.op {
                op.device_option = Some(option);
            }
        }
        GraphPair {
            init: self.init,
            predict: self.predict,
            _state: std::marker::PhantomData,
        }
    }
}

// ── Placed state ───────────────────────────────────────────────────

impl GraphPair<Placed> {
    /// The device every operator was tagged with.
    pub fn device(&self) -> DeviceType {
        DeviceType::from_option(self.predict.device_option.as_ref())
    }
}
