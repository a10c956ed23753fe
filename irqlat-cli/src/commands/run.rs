// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `irqlat run` command - Measure interrupt latency on the board.
//!
//! Acquires the memory window, the interrupt device and the signal handlers,
//! runs the configured series and releases everything before exiting.

use irqlat_core::HardwareContext;

use super::{load_config, print_series, CommandError, CommandResult, Overrides};

pub fn execute(config_path: Option<&str>, overrides: Overrides, json: bool) -> CommandResult {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config)?;

    println!("Process Id (Pid) is: {}", nix::unistd::getpid());

    tracing::info!(
        memory = %config.devices.memory.display(),
        interrupt = %config.devices.interrupt.display(),
        register = %config.measurement.register_address,
        pin = config.measurement.pin.value(),
        sets = config.measurement.sets,
        samples = config.measurement.samples,
        "Starting latency measurement"
    );

    let mut ctx = HardwareContext::acquire(&config)?;

    let outcome = ctx.run(&config.measurement, |report| print_series(report, json));
    let released = ctx.release();

    match (outcome, released) {
        (Ok(summary), Ok(())) => {
            if summary.stopped {
                tracing::info!(series = summary.reports.len(), "Stopped on request");
            }
            println!("Monitoring GPIO interrupt has finished");
            Ok(())
        }
        (Ok(_), Err(release)) => Err(release.into()),
        (Err(source), Ok(())) => Err(source.into()),
        (Err(source), Err(release)) => Err(CommandError::ReleaseAfterFailure { source, release }),
    }
}
