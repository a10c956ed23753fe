// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Measurement context objects.
//!
//! `HardwareContext` owns every resource a run against a real board needs
//! and releases them in reverse acquisition order. `SimulatedContext` runs
//! the same pipeline against a simulated endpoint. Both hand the actual work
//! to `SeriesRunner`.

use std::sync::Arc;

use crate::clock::{Clock, MonotonicClock};
use crate::config::{Config, MeasurementConfig};
use crate::error::{IrqLatError, IrqLatResult};
use crate::irq::InterruptEndpoint;
use crate::mmio::{PinDriver, RegisterHandle};
use crate::notify::{AsyncDevice, ClockedSink, EventSlot, RunControl, SignalRouter};
use crate::report::{InterruptAccounting, ResultLog, SeriesReport};
use crate::sampler::Sampler;
use crate::sim::{LoopbackPin, Propagation, SimulatedPlatform, SimulatedRegister};
use crate::stats::summarize;
use crate::types::IrqLine;

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<SeriesReport>,
    /// True if a stop request ended the run before all series finished.
    pub stopped: bool,
}

/// Runs N series of M trials and reports each one.
pub struct SeriesRunner<'a, D: PinDriver, C: Clock> {
    driver: &'a mut D,
    clock: &'a C,
    slot: &'a EventSlot,
    control: &'a RunControl,
    log: Option<&'a mut ResultLog>,
    accounting: Option<&'a mut InterruptAccounting>,
}

impl<'a, D: PinDriver, C: Clock> SeriesRunner<'a, D, C> {
    pub fn new(
        driver: &'a mut D,
        clock: &'a C,
        slot: &'a EventSlot,
        control: &'a RunControl,
    ) -> Self {
        Self {
            driver,
            clock,
            slot,
            control,
            log: None,
            accounting: None,
        }
    }

    pub fn with_log(mut self, log: &'a mut ResultLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_accounting(mut self, accounting: &'a mut InterruptAccounting) -> Self {
        self.accounting = Some(accounting);
        self
    }

    /// Run every configured series.
    ///
    /// A failing trial abandons the current series and returns the error;
    /// series already finished have been logged by then.
    pub fn run(
        &mut self,
        measurement: &MeasurementConfig,
        mut on_series: impl FnMut(&SeriesReport),
    ) -> IrqLatResult<RunSummary> {
        let mut summary = RunSummary::default();

        let mut sampler = Sampler::new(
            &mut *self.driver,
            self.slot,
            self.clock,
            self.control,
            measurement.register_address,
            measurement.pin,
        )
        .with_wait_policy(measurement.wait);

        sampler.idle_pin()?;

        for set in 0..measurement.sets {
            if !self.control.is_running() {
                summary.stopped = true;
                break;
            }

            tracing::info!(series = set, samples = measurement.samples, "Starting series");
            let series = sampler.run_series(measurement.samples)?;

            if series.trials.is_empty() {
                summary.stopped = true;
                break;
            }

            let stats = summarize(&series.trials)?;
            let accounting = match self.accounting.as_deref_mut() {
                Some(accounting) => accounting.matching_lines()?,
                None => Vec::new(),
            };
            if let Some(log) = self.log.as_deref_mut() {
                log.append(&stats)?;
            }

            tracing::info!(
                series = set,
                min_us = stats.min_us,
                max_us = stats.max_us,
                mean_us = stats.mean_us,
                completed = series.completed,
                "Series finished"
            );

            let report = SeriesReport {
                series: set,
                stats,
                completed: series.completed,
                accounting,
            };
            on_series(&report);
            summary.reports.push(report);

            if !series.completed {
                summary.stopped = true;
                break;
            }
        }

        Ok(summary)
    }
}

/// Everything a hardware run holds, declared in release order.
pub struct HardwareContext {
    registers: RegisterHandle,
    device: AsyncDevice,
    router: SignalRouter,
    log: ResultLog,
    accounting: InterruptAccounting,
    clock: MonotonicClock,
}

impl HardwareContext {
    /// Acquire all resources. Whatever was acquired before a failure is
    /// released as the partial context unwinds.
    pub fn acquire(config: &Config) -> IrqLatResult<Self> {
        let accounting = InterruptAccounting::open(
            &config.devices.accounting,
            config.measurement.accounting_prefix.clone(),
        )?;
        let log = ResultLog::open(&config.result_log)?;

        // Handlers must be in place before O_ASYNC, or the first SIGIO kills us.
        let router = SignalRouter::install()?;

        let device = AsyncDevice::open(&config.devices.interrupt)?;
        tracing::info!(device = %device.path(), "Interrupt device opened");
        device.enable_async()?;
        tracing::info!(device = %device.path(), "Asynchronous notification enabled");

        let registers = RegisterHandle::open(&config.devices.memory)?;
        tracing::info!(device = %registers.device(), "Memory device opened");

        Ok(Self {
            registers,
            device,
            router,
            log,
            accounting,
            clock: MonotonicClock,
        })
    }

    pub fn run(
        &mut self,
        measurement: &MeasurementConfig,
        on_series: impl FnMut(&SeriesReport),
    ) -> IrqLatResult<RunSummary> {
        let slot = self.router.edge_slot();
        let control = self.router.run_control();

        SeriesRunner::new(&mut self.registers, &self.clock, slot, control)
            .with_log(&mut self.log)
            .with_accounting(&mut self.accounting)
            .run(measurement, on_series)
    }

    /// Close the register window explicitly, then drop the rest in order.
    pub fn release(mut self) -> IrqLatResult<()> {
        let closed = self.registers.close().map_err(IrqLatError::from);
        tracing::debug!(device = %self.device.path(), "Releasing interrupt device");
        drop(self);
        closed
    }
}

/// Pipeline against a simulated interrupt endpoint.
pub struct SimulatedContext<C: Clock + 'static> {
    pin: LoopbackPin<SimulatedRegister>,
    slot: Arc<EventSlot>,
    control: RunControl,
    clock: Arc<C>,
    endpoint: InterruptEndpoint<SimulatedPlatform>,
}

impl<C: Clock + 'static> SimulatedContext<C> {
    /// Load a simulated endpoint and register a consumer stamped by `clock`.
    pub fn new(line: IrqLine, propagation: Propagation, clock: Arc<C>) -> IrqLatResult<Self> {
        let endpoint = InterruptEndpoint::load(SimulatedPlatform::new(line))?;
        let slot = Arc::new(EventSlot::new());
        endpoint.register_consumer(Arc::new(ClockedSink::new(
            Arc::clone(&slot),
            Arc::clone(&clock),
        )));

        let pin = LoopbackPin::new(SimulatedRegister::new(), endpoint.dispatcher(), propagation);

        Ok(Self {
            pin,
            slot,
            control: RunControl::new(),
            clock,
            endpoint,
        })
    }

    /// Raise several edges per assertion.
    pub fn with_edges_per_rise(mut self, edges: u32) -> Self {
        self.pin = self.pin.with_edges_per_rise(edges);
        self
    }

    pub fn run(
        &mut self,
        measurement: &MeasurementConfig,
        log: Option<&mut ResultLog>,
        on_series: impl FnMut(&SeriesReport),
    ) -> IrqLatResult<RunSummary> {
        let mut runner =
            SeriesRunner::new(&mut self.pin, self.clock.as_ref(), &self.slot, &self.control);
        if let Some(log) = log {
            runner = runner.with_log(log);
        }
        runner.run(measurement, on_series)
    }

    /// Edges the endpoint has counted, including coalesced ones.
    pub fn edge_count(&self) -> u64 {
        self.endpoint.edge_count()
    }

    pub fn run_control(&self) -> &RunControl {
        &self.control
    }

    pub fn endpoint(&self) -> &InterruptEndpoint<SimulatedPlatform> {
        &self.endpoint
    }
}
