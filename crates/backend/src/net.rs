// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runnable networks.
//!
//! A [`Net`] is built once from a placed [`NetDef`]: every operator type is
//! resolved against the global registry up front, so an unknown operator
//! fails at build time rather than halfway through a run.

use crate::ops::{global_init, Kernel};
use crate::workspace::{Storage, Workspace};
use crate::BackendError;
use graph_ir::{DeviceType, NetDef, OperatorDef};
use std::borrow::Cow;
use tensor_core::Tensor;

struct Step {
    def: OperatorDef,
    device: DeviceType,
    kernel: Kernel,
}

/// An executable operator sequence.
pub struct Net {
    name: String,
    steps: Vec<Step>,
}

impl std::fmt::Debug for Net {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Net")
            .field("name", &self.name)
            .field("ops", &self.steps.len())
            .finish()
    }
}

impl Net {
    /// Resolves every operator of `def`.
    ///
    /// # Errors
    /// [`BackendError::UnknownOperator`] for the first unregistered type.
    pub fn new(def: &NetDef) -> Result<Self, BackendError> {
        let registry = global_init();
        let steps = def
            .op
            .iter()
            .map(|op| {
                Ok(Step {
                    kernel: registry.get(&op.r#type)?,
                    device: DeviceType::from_option(op.device_option.as_ref()),
                    def: op.clone(),
                })
            })
            .collect::<Result<Vec<_>, BackendError>>()?;
        Ok(Self {
            name: def.name.clone(),
            steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of operators.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs every operator in order against `ws`.
    ///
    /// Inputs resident on an accelerator are downloaded before the kernel
    /// runs; outputs are stored on the operator's device. Output blobs are
    /// created as needed.
    pub fn run(&self, ws: &mut Workspace) -> Result<(), BackendError> {
        for step in &self.steps {
            let outputs = run_step(step, ws).map_err(|e| BackendError::OperatorFailed {
                op: step.def.label().to_string(),
                source: Box::new(e),
            })?;
            for (name, tensor) in step.def.output.iter().zip(outputs) {
                ws.create_blob(name).set(Storage::on(step.device, tensor));
            }
        }
        tracing::debug!(net = %self.name, ops = self.steps.len(), "net run complete");
        Ok(())
    }
}

fn run_step(step: &Step, ws: &Workspace) -> Result<Vec<Tensor>, BackendError> {
    let staged: Vec<Cow<'_, Tensor>> = step
        .def
        .input
        .iter()
        .map(|name| ws.get(name)?.to_host(name))
        .collect::<Result<_, _>>()?;
    let inputs: Vec<&Tensor> = staged.iter().map(|c| c.as_ref()).collect();

    tracing::trace!(op = step.def.label(), inputs = inputs.len(), "running operator");
    let outputs = (step.kernel)(&step.def, &inputs)?;
    if outputs.len() < step.def.output.len() {
        return Err(BackendError::InvalidOperator {
            op: step.def.label().to_string(),
            detail: format!(
                "declares {} outputs but the kernel produced {}",
                step.def.output.len(),
                outputs.len()
            ),
        });
    }
    Ok(outputs)
}

/// Builds `def` and runs it once.
pub fn run_net_once(def: &NetDef, ws: &mut Workspace) -> Result<(), BackendError> {
    Net::new(def)?.run(ws)
}
