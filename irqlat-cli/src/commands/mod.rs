// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

use std::time::Duration;

use irqlat_core::{Config, ConfigLoader, SeriesReport, WaitPolicy};

pub mod run;
pub mod simulate;
pub mod validate;

/// Error type shared by the command handlers.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Core(#[from] irqlat_core::IrqLatError),

    #[error("Invalid command-line value for --{flag}: {reason}")]
    InvalidFlag { flag: &'static str, reason: String },

    #[error("Run failed: {source}; releasing resources also failed: {release}")]
    ReleaseAfterFailure {
        source: irqlat_core::IrqLatError,
        release: irqlat_core::IrqLatError,
    },
}

pub type CommandResult = Result<(), CommandError>;

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub sets: Option<usize>,
    pub samples: Option<usize>,
    pub wait_timeout_ms: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) -> Result<(), CommandError> {
        if let Some(sets) = self.sets {
            config.measurement.sets = positive("sets", sets as u64)? as usize;
        }
        if let Some(samples) = self.samples {
            config.measurement.samples = positive("samples", samples as u64)? as usize;
        }
        if let Some(ms) = self.wait_timeout_ms {
            let ms = positive("wait-timeout-ms", ms)?;
            config.measurement.wait = WaitPolicy::Deadline(Duration::from_millis(ms));
        }
        Ok(())
    }
}

fn positive(flag: &'static str, value: u64) -> Result<u64, CommandError> {
    if value == 0 {
        return Err(CommandError::InvalidFlag {
            flag,
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(value)
}

/// Load the configuration file, or the built-in defaults when none is given.
pub fn load_config(path: Option<&str>) -> Result<Config, CommandError> {
    let config = match path {
        Some(path) => {
            tracing::info!(config = %path, "Loading configuration");
            ConfigLoader::load_file(path)?
        }
        None => ConfigLoader::defaults()?,
    };
    Ok(config)
}

/// Print one series either as the text block or as JSON.
pub fn print_series(report: &SeriesReport, json: bool) {
    if json {
        match report.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => tracing::warn!(error = %e, "Failed to encode series as JSON"),
        }
    } else {
        println!();
        println!("Series {}:", report.series + 1);
        print!("{}", report.render());
    }
}
