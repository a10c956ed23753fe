// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Simulated hardware for running the pipeline without a board.
//!
//! `SimulatedPlatform` stands in for the kernel side of an interrupt
//! endpoint, `SimulatedRegister` for a GPIO register file, and `LoopbackPin`
//! wires an output pin straight back into an endpoint's edge handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::ManualClock;
use crate::error::{EndpointError, RegisterError};
use crate::irq::{EdgeDispatcher, IrqPlatform, Stage};
use crate::mmio::{apply_bit, PinDriver};
use crate::types::{IrqLine, PinIndex, RegisterAddress};

/// A call made by an endpoint against the simulated platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformCall {
    Probe,
    Acquire(Stage),
    Release(Stage),
}

/// In-memory platform with failure injection and a call journal.
#[derive(Debug)]
pub struct SimulatedPlatform {
    line: Option<IrqLine>,
    fail_at: Option<Stage>,
    journal: Arc<Mutex<Vec<PlatformCall>>>,
}

impl SimulatedPlatform {
    pub fn new(line: IrqLine) -> Self {
        Self {
            line: Some(line),
            fail_at: None,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A platform whose probe finds no interrupt resource.
    pub fn without_irq() -> Self {
        Self {
            line: None,
            fail_at: None,
            journal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make acquiring `stage` fail.
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Shared view of every call made so far.
    pub fn journal(&self) -> Arc<Mutex<Vec<PlatformCall>>> {
        Arc::clone(&self.journal)
    }

    fn record(&self, call: PlatformCall) {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push(call);
        }
    }
}

impl IrqPlatform for SimulatedPlatform {
    fn probe(&mut self) -> Result<IrqLine, EndpointError> {
        self.record(PlatformCall::Probe);
        self.line.ok_or_else(|| EndpointError::ProbeFailed {
            reason: "No IRQ resource found".to_string(),
        })
    }

    fn acquire(
        &mut self,
        stage: Stage,
        _line: Option<IrqLine>,
        _handler: &Arc<EdgeDispatcher>,
    ) -> Result<(), EndpointError> {
        if self.fail_at == Some(stage) {
            return Err(EndpointError::RegistrationFailed {
                stage: stage.name(),
                reason: "Injected failure".to_string(),
            });
        }
        self.record(PlatformCall::Acquire(stage));
        Ok(())
    }

    fn release(&mut self, stage: Stage, _line: Option<IrqLine>) {
        self.record(PlatformCall::Release(stage));
    }
}

/// In-memory register file with the same masked write semantics as the
/// mapped hardware registers.
#[derive(Debug, Default)]
pub struct SimulatedRegister {
    words: HashMap<RegisterAddress, u32>,
}

impl SimulatedRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, address: RegisterAddress) -> u32 {
        self.words.get(&address).copied().unwrap_or(0)
    }

    pub fn write(&mut self, address: RegisterAddress, word: u32) {
        self.words.insert(address, word);
    }
}

impl PinDriver for SimulatedRegister {
    fn set_bit(
        &mut self,
        address: RegisterAddress,
        pin: PinIndex,
        value: bool,
    ) -> Result<(), RegisterError> {
        let word = self.read(address);
        self.write(address, apply_bit(word, pin, value));
        Ok(())
    }
}

/// How a rising output edge reaches the interrupt input.
#[derive(Debug, Clone)]
pub enum Propagation {
    /// Advance a manual clock by the next scripted delay (cycling), then fire.
    Scripted {
        clock: Arc<ManualClock>,
        delays_us: Vec<u64>,
    },
    /// Spin on the wall clock for the delay, then fire.
    Spin(Duration),
    /// Fire from another thread after sleeping for the delay.
    Deferred(Duration),
    /// Never fire.
    Silent,
}

/// Output pin looped back to an endpoint's edge handler.
///
/// A 0→1 transition of the watched bit raises `edges_per_rise` edges.
pub struct LoopbackPin<D: PinDriver> {
    inner: D,
    handler: Arc<EdgeDispatcher>,
    propagation: Propagation,
    edges_per_rise: u32,
    level: bool,
    rises: usize,
}

impl<D: PinDriver> LoopbackPin<D> {
    pub fn new(inner: D, handler: Arc<EdgeDispatcher>, propagation: Propagation) -> Self {
        Self {
            inner,
            handler,
            propagation,
            edges_per_rise: 1,
            level: false,
            rises: 0,
        }
    }

    /// Raise several edges per assertion, as a bouncing input would.
    pub fn with_edges_per_rise(mut self, edges: u32) -> Self {
        self.edges_per_rise = edges;
        self
    }

    /// Number of 0→1 transitions driven so far.
    pub fn rises(&self) -> usize {
        self.rises
    }

    fn propagate(&mut self) {
        let edges = self.edges_per_rise;
        match &self.propagation {
            Propagation::Scripted { clock, delays_us } => {
                let delay = delays_us
                    .get(self.rises % delays_us.len().max(1))
                    .copied()
                    .unwrap_or(0);
                clock.advance(Duration::from_micros(delay));
                fire(&self.handler, edges);
            }
            Propagation::Spin(delay) => {
                let until = Instant::now() + *delay;
                while Instant::now() < until {
                    std::hint::spin_loop();
                }
                fire(&self.handler, edges);
            }
            Propagation::Deferred(delay) => {
                let handler = Arc::clone(&self.handler);
                let delay = *delay;
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    fire(&handler, edges);
                });
            }
            Propagation::Silent => {}
        }
    }
}

fn fire(handler: &EdgeDispatcher, edges: u32) {
    for _ in 0..edges {
        handler.handle_edge();
    }
}

impl<D: PinDriver> PinDriver for LoopbackPin<D> {
    fn set_bit(
        &mut self,
        address: RegisterAddress,
        pin: PinIndex,
        value: bool,
    ) -> Result<(), RegisterError> {
        self.inner.set_bit(address, pin, value)?;

        let rising = value && !self.level;
        self.level = value;
        if rising {
            self.propagate();
            self.rises += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irq::InterruptEndpoint;
    use crate::notify::{ClockedSink, EventSlot};

    fn addr() -> RegisterAddress {
        RegisterAddress::new(0x100).unwrap()
    }

    #[test]
    fn test_simulated_register_masked_write() {
        let mut reg = SimulatedRegister::new();
        reg.write(addr(), 0xF0F0_0000);
        reg.set_bit(addr(), PinIndex::new(2).unwrap(), true).unwrap();
        assert_eq!(reg.read(addr()), 0xF0F0_0004);
        reg.set_bit(addr(), PinIndex::new(2).unwrap(), false).unwrap();
        assert_eq!(reg.read(addr()), 0xF0F0_0000);
    }

    #[test]
    fn test_probe_without_irq_fails() {
        let err = InterruptEndpoint::load(SimulatedPlatform::without_irq())
            .err()
            .unwrap();
        assert!(matches!(err, EndpointError::ProbeFailed { .. }));
    }

    #[test]
    fn test_loopback_fires_only_on_rising_edge() {
        let endpoint = InterruptEndpoint::load(SimulatedPlatform::new(IrqLine::new(164))).unwrap();
        let clock = Arc::new(ManualClock::new());
        let mut pin = LoopbackPin::new(
            SimulatedRegister::new(),
            endpoint.dispatcher(),
            Propagation::Scripted {
                clock: clock.clone(),
                delays_us: vec![10],
            },
        );
        let p = PinIndex::new(0).unwrap();

        pin.set_bit(addr(), p, true).unwrap();
        pin.set_bit(addr(), p, true).unwrap();
        pin.set_bit(addr(), p, false).unwrap();
        pin.set_bit(addr(), p, true).unwrap();

        assert_eq!(pin.rises(), 2);
        assert_eq!(endpoint.edge_count(), 2);
    }

    #[test]
    fn test_double_edge_coalesces_for_consumer() {
        let endpoint = InterruptEndpoint::load(SimulatedPlatform::new(IrqLine::new(164))).unwrap();
        let clock = Arc::new(ManualClock::new());
        let slot = Arc::new(EventSlot::new());
        endpoint.register_consumer(Arc::new(ClockedSink::new(slot.clone(), clock.clone())));

        let mut pin = LoopbackPin::new(
            SimulatedRegister::new(),
            endpoint.dispatcher(),
            Propagation::Scripted {
                clock,
                delays_us: vec![4],
            },
        )
        .with_edges_per_rise(2);

        pin.set_bit(addr(), PinIndex::new(0).unwrap(), true).unwrap();

        assert_eq!(endpoint.edge_count(), 2);
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
    }
}
