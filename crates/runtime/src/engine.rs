// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The engine context and its initialize state machine.
//!
//! ```text
//! Created
//!     │  initialize_from_native / initialize_from_interchange
//!     ▼
//! GraphLoaded ── place, run init net, create input blobs
//!     ▼
//! InputsBound ── build net, feed batch-1 zeros, run once
//!     ▼
//! Discovered ─── record output shapes and dtypes
//!     ▼
//! Ready ──────── set_input_batch / execute / get_output, repeatedly
//! ```
//!
//! Any failure during initialize leaves the context in `Fault`, with no
//! output bindings. A context is initialized at most once.
//!
//! The state is tracked at run time rather than in the type: the C ABI
//! hands out one pointer for the whole lifetime of a context.

use crate::bindings::{BindingTable, OutputInfo};
use crate::copy::{strategy_for, TensorCopy};
use crate::RuntimeError;
use backend::{global_init, run_net_once, BackendError, DeviceProbe, HostOnly, Net, Workspace};
use graph_ir::{DeviceType, GraphError, GraphPair, Parsed, Placed};
use std::ffi::CStr;
use std::fmt;
use tensor_core::{lookup, DType, Shape, Tensor, TensorError};

// ── State ──────────────────────────────────────────────────────

/// Lifecycle state of an [`EngineContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created; inputs may be registered.
    Created,
    /// Graphs decoded and validated.
    GraphLoaded,
    /// Init net has run and every external input has a blob.
    InputsBound,
    /// The discovery pass has run.
    Discovered,
    /// Output metadata recorded; the context serves requests.
    Ready,
    /// Initialize failed. Terminal.
    Fault,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Created => "created",
            EngineState::GraphLoaded => "graph-loaded",
            EngineState::InputsBound => "inputs-bound",
            EngineState::Discovered => "discovered",
            EngineState::Ready => "ready",
            EngineState::Fault => "fault",
        };
        f.write_str(s)
    }
}

// ── Context ────────────────────────────────────────────────────

/// One loaded model plus its bindings and tensor store.
///
/// Single-threaded: a context may move between threads but is never
/// shared. Contexts are independent of each other.
///
/// # Example
/// ```
/// use graph_ir::builder::{NetBuilder, OpBuilder};
/// use runtime::EngineContext;
/// use tensor_core::DType;
///
/// let init = NetBuilder::new("init").encode();
/// let predict = NetBuilder::new("predict")
///     .external_input("x")
///     .external_output("y")
///     .op(OpBuilder::new("Relu").input("x").output("y"))
///     .encode();
///
/// let mut ctx = EngineContext::create(false);
/// ctx.register_input("x", &[1, 3], DType::F32.tag()).unwrap();
/// ctx.initialize_from_native(&init, &predict).unwrap();
///
/// let x: Vec<u8> = [-1.0f32, 0.5, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
/// ctx.set_input_batch("x", &x, 3, &[1, 3]).unwrap();
/// ctx.execute().unwrap();
///
/// let mut out = vec![0u8; ctx.get_output_size(0).unwrap()];
/// let mut dims = [0i64; 2];
/// assert_eq!(ctx.get_output(0, &mut out, &mut dims).unwrap(), 12);
/// assert_eq!(dims, [1, 3]);
/// ```
pub struct EngineContext {
    use_accelerator: bool,
    copier: Box<dyn TensorCopy>,
    state: EngineState,
    fault: Option<String>,
    bindings: BindingTable,
    workspace: Workspace,
    graphs: Option<GraphPair<Placed>>,
    net: Option<Net>,
    graph_inputs: Vec<String>,
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("use_accelerator", &self.use_accelerator)
            .field("state", &self.state)
            .field("inputs", &self.bindings.input_count())
            .field("outputs", &self.bindings.output_count())
            .finish()
    }
}

impl EngineContext {
    /// Creates a context on a machine probed with [`HostOnly`].
    ///
    /// An accelerator request degrades to the host. Never fails.
    pub fn create(use_accelerator: bool) -> Self {
        Self::with_probe(use_accelerator, &HostOnly)
    }

    /// Creates a context, asking `probe` whether an accelerator exists.
    pub fn with_probe(use_accelerator: bool, probe: &dyn DeviceProbe) -> Self {
        global_init();
        let use_accelerator = use_accelerator && {
            let count = probe.accelerator_count();
            if count == 0 {
                tracing::warn!(
                    probe = probe.name(),
                    "accelerator requested but none detected; falling back to host"
                );
            }
            count > 0
        };
        let device = if use_accelerator {
            DeviceType::Accelerator
        } else {
            DeviceType::Host
        };
        tracing::info!(%device, "engine context created");
        Self {
            use_accelerator,
            copier: strategy_for(device),
            state: EngineState::Created,
            fault: None,
            bindings: BindingTable::new(),
            workspace: Workspace::new(),
            graphs: None,
            net: None,
            graph_inputs: Vec::new(),
        }
    }

    /// Whether this context runs on an accelerator.
    pub fn uses_accelerator(&self) -> bool {
        self.use_accelerator
    }

    /// The device the copy strategy targets.
    pub fn device(&self) -> DeviceType {
        self.copier.device()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Why initialize failed, once the context is in `Fault`.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// One-line description of the loaded graphs.
    pub fn graph_summary(&self) -> Option<String> {
        self.graphs.as_ref().map(GraphPair::summary)
    }

    fn expect_state(&self, op: &'static str, allowed: EngineState) -> Result<(), RuntimeError> {
        if self.state == EngineState::Fault {
            return Err(RuntimeError::Faulted(
                self.fault.clone().unwrap_or_default(),
            ));
        }
        if self.state != allowed {
            return Err(RuntimeError::InvalidState {
                op,
                state: self.state,
            });
        }
        Ok(())
    }

    // ── Registration & initialize ──────────────────────────────

    /// Registers an input with its full shape (batch first) and dtype tag.
    ///
    /// Only allowed before initialize. Returns the input's index.
    pub fn register_input(
        &mut self,
        name: &str,
        shape: &[i64],
        dtype_tag: i32,
    ) -> Result<usize, RuntimeError> {
        self.expect_state("register_input", EngineState::Created)?;
        let dtype = lookup(dtype_tag)?.dtype;
        let dims = Shape::from_i64(shape)?;
        if dims.rank() == 0 {
            return Err(RuntimeError::MissingBatchDim {
                name: name.to_string(),
            });
        }
        if dims.with_batch(1).checked_size_bytes(dtype).is_none() {
            return Err(TensorError::InvalidShape(format!(
                "byte size of one {dtype} item of '{name}' {dims} overflows"
            ))
            .into());
        }
        let index = self.bindings.register_input(name, shape.to_vec(), dtype)?;
        tracing::debug!(input = name, index, %dtype, ?shape, "input registered");
        Ok(index)
    }

    /// Initializes from the two native serialized nets.
    pub fn initialize_from_native(
        &mut self,
        init_bytes: &[u8],
        predict_bytes: &[u8],
    ) -> Result<(), RuntimeError> {
        self.expect_state("initialize", EngineState::Created)?;
        self.initialize(GraphPair::from_native(init_bytes, predict_bytes))
    }

    /// Initializes from a serialized interchange model.
    pub fn initialize_from_interchange(&mut self, model_bytes: &[u8]) -> Result<(), RuntimeError> {
        self.expect_state("initialize", EngineState::Created)?;
        self.initialize(GraphPair::from_interchange(model_bytes))
    }

    fn initialize(&mut self, parsed: Result<GraphPair<Parsed>, GraphError>) -> Result<(), RuntimeError> {
        let result = match parsed {
            Ok(pair) => {
                self.state = EngineState::GraphLoaded;
                self.run_initialize(pair)
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            tracing::error!(state = %self.state, error = %e, "initialize failed");
            self.state = EngineState::Fault;
            self.fault = Some(e.to_string());
            self.bindings.clear_outputs();
            self.graphs = None;
            self.net = None;
        }
        result
    }

    fn run_initialize(&mut self, pair: GraphPair<Parsed>) -> Result<(), RuntimeError> {
        let graphs = pair.place(self.copier.device());
        tracing::info!(device = %graphs.device(), "{}", graphs.summary());

        // GraphLoaded → InputsBound
        run_net_once(graphs.init(), &mut self.workspace)?;
        for name in graphs.external_inputs() {
            self.workspace.create_blob(name);
        }
        self.graph_inputs = graphs.external_inputs().to_vec();
        self.state = EngineState::InputsBound;

        // InputsBound → Discovered
        let net = Net::new(graphs.predict())?;
        for name in self.bindings.input_names() {
            if !self.graph_inputs.iter().any(|g| g == name) {
                return Err(RuntimeError::NotInGraph(name.to_string()));
            }
            let (dims, dtype) = self
                .bindings
                .dims(name)
                .zip(self.bindings.dtype(name))
                .ok_or_else(|| RuntimeError::UnknownName {
                    kind: "input",
                    name: name.to_string(),
                })?;
            let shape = Shape::from_i64(dims)?.with_batch(1);
            let zeros = Tensor::zeroed_bytes(&shape, dtype)?;
            self.copier
                .copy_in(name, dtype, shape, &zeros, self.workspace.create_blob(name))?;
        }
        net.run(&mut self.workspace)?;
        self.state = EngineState::Discovered;

        // Discovered → Ready
        let outputs = graphs
            .external_outputs()
            .iter()
            .map(|name| {
                let blob = self.workspace.get(name)?;
                let (shape, dtype) = blob
                    .shape()
                    .zip(blob.dtype())
                    .ok_or_else(|| BackendError::EmptyBlob(name.clone()))?;
                Ok(OutputInfo {
                    name: name.clone(),
                    dims: shape.to_i64(),
                    dtype,
                })
            })
            .collect::<Result<Vec<_>, RuntimeError>>()?;
        self.bindings.commit_outputs(outputs)?;

        self.graphs = Some(graphs);
        self.net = Some(net);
        self.state = EngineState::Ready;
        tracing::info!(
            inputs = self.bindings.input_count(),
            outputs = self.bindings.output_count(),
            "engine ready"
        );
        Ok(())
    }

    // ── Serving ────────────────────────────────────────────────

    /// Copies a batch into input `name`.
    ///
    /// `shape` gives the per-item dimensions after its first entry; those
    /// must match the registered shape. The batch size is
    /// `element_count / per_item`, whatever `shape[0]` says. `bytes` must
    /// hold exactly `element_count` elements. Nothing is copied unless every
    /// check passes.
    pub fn set_input_batch(
        &mut self,
        name: &str,
        bytes: &[u8],
        element_count: usize,
        shape: &[i64],
    ) -> Result<(), RuntimeError> {
        self.expect_state("set_input_batch", EngineState::Ready)?;
        let unknown = || RuntimeError::UnknownName {
            kind: "input",
            name: name.to_string(),
        };
        if self.bindings.input_index(name).is_none() {
            return Err(unknown());
        }
        let dtype = self.bindings.dtype(name).ok_or_else(unknown)?;
        let registered = Shape::from_i64(self.bindings.dims(name).ok_or_else(unknown)?)?;

        let given = Shape::from_i64(shape)?;
        if given.rank() == 0 {
            return Err(RuntimeError::MissingBatchDim {
                name: name.to_string(),
            });
        }
        let per_item = given.per_item();
        if per_item != registered.per_item() {
            return Err(RuntimeError::PerItemShape {
                name: name.to_string(),
                expected: registered.per_item(),
                actual: per_item,
            });
        }
        let per = per_item.num_elements();
        if per == 0 || element_count == 0 || element_count % per != 0 {
            return Err(RuntimeError::NotBatchMultiple {
                name: name.to_string(),
                element_count,
                per_item: per,
            });
        }
        let batch_shape = given.with_batch(element_count / per);
        self.copier
            .copy_in(name, dtype, batch_shape, bytes, self.workspace.create_blob(name))
    }

    /// Runs the prediction net once.
    pub fn execute(&mut self) -> Result<(), RuntimeError> {
        self.expect_state("execute", EngineState::Ready)?;
        let net = self.net.as_ref().ok_or(RuntimeError::InvalidState {
            op: "execute",
            state: self.state,
        })?;
        net.run(&mut self.workspace)?;
        Ok(())
    }

    fn output_at(&self, index: usize) -> Result<&str, RuntimeError> {
        self.bindings
            .output_name(index)
            .ok_or(RuntimeError::IndexOutOfRange {
                kind: "output",
                index,
                count: self.bindings.output_count(),
            })
    }

    /// Copies output `index` into `out` and its dimensions into `shape`.
    ///
    /// `shape` must be exactly the output's rank long and `out` at least its
    /// byte size; otherwise neither buffer is written. Returns the number
    /// of bytes written and records the shape as the output's current one.
    pub fn get_output(
        &mut self,
        index: usize,
        out: &mut [u8],
        shape: &mut [i64],
    ) -> Result<usize, RuntimeError> {
        self.expect_state("get_output", EngineState::Ready)?;
        let name = self.output_at(index)?.to_string();
        let blob = self.workspace.get(&name)?;
        let host = self.copier.copy_out(&name, blob)?;

        let dims = host.shape().to_i64();
        if shape.len() != dims.len() {
            return Err(RuntimeError::RankMismatch {
                name,
                expected: dims.len(),
                actual: shape.len(),
            });
        }
        let bytes = host.as_bytes();
        if out.len() < bytes.len() {
            return Err(RuntimeError::BufferTooSmall {
                name,
                needed: bytes.len(),
                capacity: out.len(),
            });
        }
        let written = bytes.len();
        out[..written].copy_from_slice(bytes);
        shape.copy_from_slice(&dims);
        drop(host);

        self.bindings.set_dims(&name, dims);
        Ok(written)
    }

    /// Byte size of output `index` as it currently stands.
    pub fn get_output_size(&self, index: usize) -> Result<usize, RuntimeError> {
        self.expect_state("get_output_size", EngineState::Ready)?;
        let name = self.output_at(index)?;
        self.workspace
            .get(name)?
            .size_bytes()
            .ok_or_else(|| BackendError::EmptyBlob(name.to_string()).into())
    }

    /// Index of output `name`.
    pub fn get_output_index(&self, name: &str) -> Option<usize> {
        self.bindings.output_index(name)
    }

    /// Copies the last recorded shape of `name` into `out` and returns the
    /// rank. `out` must be exactly rank long.
    pub fn get_dimensions(&self, name: &str, out: &mut [i64]) -> Result<usize, RuntimeError> {
        let dims = self.dims(name)?;
        if out.len() != dims.len() {
            return Err(RuntimeError::RankMismatch {
                name: name.to_string(),
                expected: dims.len(),
                actual: out.len(),
            });
        }
        out.copy_from_slice(dims);
        Ok(dims.len())
    }

    /// Last recorded shape of `name`.
    pub fn dims(&self, name: &str) -> Result<&[i64], RuntimeError> {
        self.bindings.dims(name).ok_or_else(|| RuntimeError::UnknownName {
            kind: "tensor",
            name: name.to_string(),
        })
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn input_count(&self) -> usize {
        self.bindings.input_count()
    }

    pub fn output_count(&self) -> usize {
        self.bindings.output_count()
    }

    pub fn input_name(&self, index: usize) -> Option<&str> {
        self.bindings.input_name(index)
    }

    pub fn output_name(&self, index: usize) -> Option<&str> {
        self.bindings.output_name(index)
    }

    pub fn input_c_name(&self, index: usize) -> Option<&CStr> {
        self.bindings.input_c_name(index)
    }

    pub fn output_c_name(&self, index: usize) -> Option<&CStr> {
        self.bindings.output_c_name(index)
    }

    /// Dtype of input or output `name`.
    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.bindings.dtype(name)
    }

    /// Element width of input or output `name`, in bytes.
    pub fn itemsize(&self, name: &str) -> Option<usize> {
        self.bindings.itemsize(name)
    }
}
