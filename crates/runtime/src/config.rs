// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Engine configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! use_accelerator = true
//! simulated_accelerators = 1
//!
//! [model]
//! format = "native"
//! init = "./models/squeezenet/init_net.pb"
//! predict = "./models/squeezenet/predict_net.pb"
//!
//! [[inputs]]
//! name = "data"
//! shape = [1, 3, 224, 224]
//! dtype = "float32"
//! ```
//!
//! Relative model paths are resolved against the config file's directory
//! when loaded with [`EngineConfig::from_file`].

use crate::{EngineContext, RuntimeError};
use backend::{HostOnly, SimulatedAccelerator};
use std::path::{Path, PathBuf};
use tensor_core::DType;

/// Where the serialized graphs live.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ModelSource {
    /// Two native nets: init and predict.
    Native { init: PathBuf, predict: PathBuf },
    /// One interchange model.
    Interchange { path: PathBuf },
}

impl ModelSource {
    fn resolve(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        match self {
            ModelSource::Native { init, predict } => {
                join(init);
                join(predict);
            }
            ModelSource::Interchange { path } => join(path),
        }
    }
}

/// An input to register before initialize.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InputSpec {
    pub name: String,
    /// Full shape, batch dimension first.
    pub shape: Vec<i64>,
    /// Dtype name, e.g. `"float32"` or `"u8"`.
    #[serde(default = "default_dtype")]
    pub dtype: String,
}

fn default_dtype() -> String {
    DType::F32.as_str().to_string()
}

impl InputSpec {
    /// Resolves the dtype name.
    pub fn dtype(&self) -> Result<DType, RuntimeError> {
        DType::parse(&self.dtype).ok_or_else(|| {
            RuntimeError::ConfigError(format!(
                "input '{}': unknown dtype '{}'",
                self.name, self.dtype
            ))
        })
    }
}

/// Configuration for one engine context.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    /// Request an accelerator; degrades to host when none is found.
    #[serde(default)]
    pub use_accelerator: bool,
    /// Number of simulated accelerators the device probe reports.
    #[serde(default)]
    pub simulated_accelerators: usize,
    pub model: ModelSource,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(dir) = path.parent() {
            config.model.resolve(dir);
        }
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Creates a context, registers every input and initializes it from the
    /// configured model files.
    pub fn load_context(&self) -> Result<EngineContext, RuntimeError> {
        let mut ctx = if self.simulated_accelerators > 0 {
            let probe = SimulatedAccelerator {
                count: self.simulated_accelerators,
            };
            EngineContext::with_probe(self.use_accelerator, &probe)
        } else {
            EngineContext::with_probe(self.use_accelerator, &HostOnly)
        };
        for input in &self.inputs {
            ctx.register_input(&input.name, &input.shape, input.dtype()?.tag())?;
        }
        match &self.model {
            ModelSource::Native { init, predict } => {
                ctx.initialize_from_native(&read(init)?, &read(predict)?)?
            }
            ModelSource::Interchange { path } => ctx.initialize_from_interchange(&read(path)?)?,
        }
        Ok(ctx)
    }
}

fn read(path: &Path) -> Result<Vec<u8>, RuntimeError> {
    std::fs::read(path).map_err(|e| {
        RuntimeError::ConfigError(format!("cannot read model '{}': {e}", path.display()))
    })
}
