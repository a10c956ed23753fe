// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `irqlat simulate` command - Exercise the pipeline without hardware.

use std::sync::Arc;
use std::time::Duration;

use irqlat_core::sim::Propagation;
use irqlat_core::{IrqLine, MonotonicClock, ResultLog, SimulatedContext, WaitPolicy};

use super::{load_config, print_series, CommandResult, Overrides};

/// Line number reported by the simulated endpoint.
const SIMULATED_LINE: u32 = 164;

pub struct SimulateArgs {
    pub delay_us: u64,
    pub sets: Option<usize>,
    pub samples: Option<usize>,
    pub edges_per_rise: u32,
    pub log: Option<String>,
    pub json: bool,
}

/// How long a trial may wait before the simulated edge counts as lost.
///
/// Bounded by `u64::MAX` microseconds times 1000, well inside `Duration`.
fn wait_deadline(delay_us: u64) -> Duration {
    Duration::from_micros(delay_us).max(Duration::from_millis(1)) * 1000
}

pub fn execute(config_path: Option<&str>, args: SimulateArgs) -> CommandResult {
    let mut config = load_config(config_path)?;
    Overrides {
        sets: args.sets,
        samples: args.samples,
        wait_timeout_ms: None,
    }
    .apply(&mut config)?;

    config.measurement.wait = WaitPolicy::Deadline(wait_deadline(args.delay_us));

    let mut log = args.log.as_deref().map(ResultLog::open).transpose()?;

    tracing::info!(
        delay_us = args.delay_us,
        sets = config.measurement.sets,
        samples = config.measurement.samples,
        edges_per_rise = args.edges_per_rise,
        "Starting simulated measurement"
    );

    let mut ctx = SimulatedContext::new(
        IrqLine::new(SIMULATED_LINE),
        Propagation::Spin(Duration::from_micros(args.delay_us)),
        Arc::new(MonotonicClock),
    )?
    .with_edges_per_rise(args.edges_per_rise.max(1));

    let summary = ctx.run(&config.measurement, log.as_mut(), |report| {
        print_series(report, args.json)
    })?;

    tracing::info!(
        series = summary.reports.len(),
        edges = ctx.edge_count(),
        endpoint = ctx.endpoint().state().name(),
        "Simulation finished"
    );
    Ok(())
}
