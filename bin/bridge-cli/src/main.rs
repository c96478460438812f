// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # gb
//!
//! Command-line interface for graph-bridge engine contexts.
//!
//! ## Usage
//! ```bash
//! # Initialize a context and print its bindings
//! gb inspect --config ./squeezenet.toml
//! gb inspect --config ./squeezenet.toml --json
//!
//! # Feed constant batches and print the outputs
//! gb run --config ./squeezenet.toml --batch 4 --fill 0.5
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gb",
    about = "Load serialized inference graphs and serve them through an engine context",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a context and print its input and output bindings.
    Inspect {
        /// Path to the engine TOML configuration.
        #[arg(short, long)]
        config: PathBuf,

        /// Print the bindings as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Feed constant-filled batches, execute once and print every output.
    Run {
        /// Path to the engine TOML configuration.
        #[arg(short, long)]
        config: PathBuf,

        /// Batch size fed to every registered input.
        #[arg(short, long, default_value_t = 1)]
        batch: usize,

        /// Value every input element is set to.
        #[arg(short, long, default_value_t = 0.0)]
        fill: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect { config, json } => commands::inspect::execute(config, json),
        Commands::Run {
            config,
            batch,
            fill,
        } => commands::run::execute(config, batch, fill),
    }
}
