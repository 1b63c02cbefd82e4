// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # gcptr
//!
//! Command-line driver for the gc-pointer registries.
//!
//! ## Usage
//! ```bash
//! # Walk through the copy / reassign / array / teardown scenarios
//! gcptr demo
//!
//! # Churn handles and verify every count after each round
//! gcptr stress --objects 64 --rounds 1000 --json
//!
//! # Print the effective configuration
//! gcptr --config gc.toml config
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gcptr",
    about = "Registry-backed reference-counted pointers",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reference scenarios and print registry dumps after each step.
    Demo,

    /// Churn handles across two partitions and check the count invariant.
    Stress {
        /// Number of distinct objects allocated up front.
        #[arg(short, long, default_value_t = 32)]
        objects: usize,

        /// Number of churn rounds.
        #[arg(short, long, default_value_t = 500)]
        rounds: usize,

        /// Print statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Demo => commands::demo::execute(config),
        Commands::Stress {
            objects,
            rounds,
            json,
        } => commands::stress::execute(config, objects, rounds, json),
        Commands::Config => commands::config::execute(&config),
    }
}
