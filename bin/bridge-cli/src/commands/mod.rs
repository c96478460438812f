// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

pub mod inspect;
pub mod run;

use anyhow::Context;
use runtime::{EngineConfig, EngineContext};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `-v` counts map to info, debug and
/// trace, with warnings shown by default.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads `config` and builds an initialized context from it.
pub fn load(config: &Path) -> anyhow::Result<(EngineConfig, EngineContext)> {
    let cfg = EngineConfig::from_file(config)?;
    let ctx = cfg
        .load_context()
        .with_context(|| format!("failed to initialize context from '{}'", config.display()))?;
    Ok((cfg, ctx))
}

/// Formats dimensions as `[1, 3, 224, 224]`.
pub fn format_dims(dims: &[i64]) -> String {
    let parts: Vec<String> = dims.iter().map(i64::to_string).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_dims() {
        assert_eq!(format_dims(&[1, 3, 224, 224]), "[1, 3, 224, 224]");
        assert_eq!(format_dims(&[]), "[]");
    }
}
