// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The engine context that hosts serialized inference graphs behind a small
//! C ABI.
//!
//! A host program creates an [`EngineContext`], registers the inputs it
//! will feed, and hands over serialized graphs. Initialize runs a discovery
//! pass on a batch of zeros to learn every output's shape and dtype. After
//! that the context serves any number of set-input / execute / get-output
//! cycles.
//!
//! - [`EngineContext`] — the safe API.
//! - [`ffi`] — `gb_*` functions over raw pointers, built into the `cdylib`.
//! - [`EngineConfig`] — TOML description of a context, used by the CLI.
//! - [`TensorCopy`] — per-context device copy strategy.

mod bindings;
mod config;
mod copy;
mod engine;
mod error;
pub mod ffi;

pub use bindings::OutputInfo;
pub use config::{EngineConfig, InputSpec, ModelSource};
pub use copy::{AcceleratorCopy, HostCopy, TensorCopy};
pub use engine::{EngineContext, EngineState};
pub use error::RuntimeError;
