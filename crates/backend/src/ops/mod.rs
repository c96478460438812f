// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator kernels and the registry that resolves operator types.
//!
//! A kernel receives its definition and host-resident inputs and returns
//! freshly allocated outputs, one per declared output name. Kernels never
//! touch the workspace; the [`Net`](crate::Net) does the staging.

mod fill;
mod math;
mod structural;

use crate::BackendError;
use graph_ir::OperatorDef;
use std::collections::HashMap;
use std::sync::OnceLock;
use tensor_core::{Shape, Tensor};

/// Signature every kernel implements.
pub type Kernel = fn(&OperatorDef, &[&Tensor]) -> Result<Vec<Tensor>, BackendError>;

/// Maps operator type names to kernels.
#[derive(Default)]
pub struct OperatorRegistry {
    kernels: HashMap<&'static str, Kernel>,
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("op_types", &self.op_types())
            .finish()
    }
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in operator.
    pub fn with_builtins() -> Self {
        let mut r = Self::new();
        r.register("GivenTensorFill", fill::given_tensor_fill);
        r.register("ConstantFill", fill::constant_fill);
        r.register("Copy", structural::copy);
        r.register("Flatten", structural::flatten);
        r.register("Reshape", structural::reshape);
        r.register("Cast", structural::cast);
        r.register("FC", math::fc);
        r.register("MatMul", math::matmul);
        r.register("Softmax", math::softmax);
        r.register("Relu", math::relu);
        r.register("Add", math::add);
        r.register("Mul", math::mul);
        r.register("Sum", math::sum);
        r.register("AveragePool", math::average_pool);
        r.register("Scale", math::scale);
        r
    }

    /// Adds or replaces the kernel for `op_type`.
    pub fn register(&mut self, op_type: &'static str, kernel: Kernel) {
        self.kernels.insert(op_type, kernel);
    }

    /// Resolves `op_type`.
    pub fn get(&self, op_type: &str) -> Result<Kernel, BackendError> {
        self.kernels
            .get(op_type)
            .copied()
            .ok_or_else(|| BackendError::UnknownOperator(op_type.to_string()))
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.kernels.contains_key(op_type)
    }

    /// Number of registered operator types.
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Registered operator types, sorted.
    pub fn op_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.kernels.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

static GLOBAL: OnceLock<OperatorRegistry> = OnceLock::new();

/// Process-wide backend initialization.
///
/// Builds the built-in registry on first call; later calls return the same
/// instance. Safe to call from any thread and from every context.
pub fn global_init() -> &'static OperatorRegistry {
    GLOBAL.get_or_init(|| {
        let registry = OperatorRegistry::with_builtins();
        tracing::info!(operators = registry.len(), "execution backend initialized");
        registry
    })
}

// ── Kernel helpers ─────────────────────────────────────────────────

pub(crate) fn invalid(def: &OperatorDef, detail: impl Into<String>) -> BackendError {
    BackendError::InvalidOperator {
        op: def.label().to_string(),
        detail: detail.into(),
    }
}

/// Returns input `i`, failing with a clear arity error.
pub(crate) fn input<'a>(
    def: &OperatorDef,
    inputs: &[&'a Tensor],
    i: usize,
) -> Result<&'a Tensor, BackendError> {
    inputs
        .get(i)
        .copied()
        .ok_or_else(|| invalid(def, format!("expected at least {} inputs, got {}", i + 1, inputs.len())))
}

/// Product of `dims`, failing instead of overflowing.
pub(crate) fn elements(def: &OperatorDef, dims: &[usize]) -> Result<usize, BackendError> {
    Shape::from(dims)
        .checked_num_elements()
        .ok_or_else(|| invalid(def, format!("element count of {dims:?} overflows")))
}

/// Resolves a possibly negative axis against `rank`.
pub(crate) fn resolve_axis(def: &OperatorDef, axis: i64, rank: usize) -> Result<usize, BackendError> {
    let resolved = if axis < 0 { axis + rank as i64 } else { axis };
    if resolved < 0 || resolved as usize > rank {
        return Err(invalid(def, format!("axis {axis} out of range for rank {rank}")));
    }
    Ok(resolved as usize)
}
