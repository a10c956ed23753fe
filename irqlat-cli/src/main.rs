// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! irqlat CLI
//!
//! Command-line interface for measuring GPIO interrupt round-trip latency.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

/// irqlat - GPIO interrupt round-trip latency monitor
#[derive(Parser)]
#[command(name = "irqlat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Measure against the real board
    Run {
        /// Number of series to run
        #[arg(long)]
        sets: Option<usize>,

        /// Trials per series
        #[arg(long)]
        samples: Option<usize>,

        /// Give up on a trial after this many milliseconds
        #[arg(long)]
        wait_timeout_ms: Option<u64>,

        /// Print each series summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the full pipeline against a simulated interrupt endpoint
    Simulate {
        /// Propagation delay from pin assertion to edge, in microseconds
        #[arg(long, default_value_t = 20)]
        delay_us: u64,

        /// Number of series to run
        #[arg(long)]
        sets: Option<usize>,

        /// Trials per series
        #[arg(long)]
        samples: Option<usize>,

        /// Edges raised per assertion (models a bouncing input)
        #[arg(long, default_value_t = 1)]
        edges_per_rise: u32,

        /// Append `<min>,<max>` lines to this file
        #[arg(long)]
        log: Option<String>,

        /// Print each series summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let result = match cli.command {
        Commands::Run {
            sets,
            samples,
            wait_timeout_ms,
            json,
        } => commands::run::execute(
            cli.config.as_deref(),
            commands::Overrides {
                sets,
                samples,
                wait_timeout_ms,
            },
            json,
        ),
        Commands::Simulate {
            delay_us,
            sets,
            samples,
            edges_per_rise,
            log,
            json,
        } => commands::simulate::execute(
            cli.config.as_deref(),
            commands::simulate::SimulateArgs {
                delay_us,
                sets,
                samples,
                edges_per_rise,
                log,
                json,
            },
        ),
        Commands::Validate { file } => commands::validate::execute(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "irqlat failed");
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}
