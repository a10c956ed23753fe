// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Interrupt endpoint lifecycle: Unbound → Bound → Armed → Unbound.
//!
//! Every platform resource the endpoint acquires is recorded as a stage so
//! teardown releases exactly what was acquired, in reverse order, and can be
//! called any number of times.

use std::fmt;
use std::sync::Arc;

use crate::error::EndpointError;
use crate::irq::dispatch::{EdgeDispatcher, EventSink};
use crate::types::IrqLine;

/// Platform resources acquired while loading an endpoint, in acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Platform driver registered (probe runs against it).
    Driver,
    /// Character device the consumer opens.
    CharDevice,
    /// Diagnostic accounting entry.
    DiagnosticEntry,
    /// Interrupt line requested with the edge handler installed.
    Irq,
}

impl Stage {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::CharDevice => "char_device",
            Self::DiagnosticEntry => "diagnostic_entry",
            Self::Irq => "irq",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The platform an endpoint binds to.
///
/// A failing `acquire` must leave that stage unacquired; `release` is only
/// ever called for stages whose `acquire` succeeded.
pub trait IrqPlatform {
    /// Find the interrupt line for this device. Requires `Stage::Driver`.
    fn probe(&mut self) -> Result<IrqLine, EndpointError>;

    /// Acquire one stage. For `Stage::Irq` the handler is installed for
    /// rising-edge triggers on `line`.
    fn acquire(
        &mut self,
        stage: Stage,
        line: Option<IrqLine>,
        handler: &Arc<EdgeDispatcher>,
    ) -> Result<(), EndpointError>;

    fn release(&mut self, stage: Stage, line: Option<IrqLine>);
}

/// Endpoint lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Nothing bound yet, or torn down.
    Unbound,
    /// Probe succeeded; handler not installed.
    Bound(IrqLine),
    /// Handler installed and counting edges.
    Armed(IrqLine),
}

impl EndpointState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unbound => "Unbound",
            Self::Bound(_) => "Bound",
            Self::Armed(_) => "Armed",
        }
    }

    pub fn line(&self) -> Option<IrqLine> {
        match self {
            Self::Unbound => None,
            Self::Bound(line) | Self::Armed(line) => Some(*line),
        }
    }
}

/// Which stages are currently held.
#[derive(Debug, Default, Clone, Copy)]
struct AcquiredStages {
    driver: bool,
    char_device: bool,
    diagnostic_entry: bool,
    irq: bool,
}

impl AcquiredStages {
    fn flag(&mut self, stage: Stage) -> &mut bool {
        match stage {
            Stage::Driver => &mut self.driver,
            Stage::CharDevice => &mut self.char_device,
            Stage::DiagnosticEntry => &mut self.diagnostic_entry,
            Stage::Irq => &mut self.irq,
        }
    }
}

/// Kernel-side binding of one interrupt line to its edge handler.
pub struct InterruptEndpoint<P: IrqPlatform> {
    platform: P,
    state: EndpointState,
    stages: AcquiredStages,
    dispatcher: Arc<EdgeDispatcher>,
}

impl<P: IrqPlatform> InterruptEndpoint<P> {
    /// Create an unbound endpoint on a platform.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            state: EndpointState::Unbound,
            stages: AcquiredStages::default(),
            dispatcher: Arc::new(EdgeDispatcher::new()),
        }
    }

    /// Bind and arm in one go, unwinding everything on failure.
    pub fn load(platform: P) -> Result<Self, EndpointError> {
        let mut endpoint = Self::new(platform);
        let result = endpoint.bind().and_then(|_| endpoint.arm());
        match result {
            Ok(line) => {
                tracing::info!(irq = %line, "Interrupt endpoint loaded");
                Ok(endpoint)
            }
            Err(e) => {
                tracing::error!(error = %e, "Interrupt endpoint failed to load");
                endpoint.teardown();
                Err(e)
            }
        }
    }

    /// Unbound → Bound: register the driver and probe for the IRQ line.
    pub fn bind(&mut self) -> Result<IrqLine, EndpointError> {
        if self.state != EndpointState::Unbound {
            return Err(EndpointError::InvalidTransition {
                from: self.state.name(),
                to: "Bound",
            });
        }

        self.acquire(Stage::Driver, None)?;
        let line = self.platform.probe()?;
        self.state = EndpointState::Bound(line);
        tracing::debug!(irq = %line, "Interrupt endpoint bound");
        Ok(line)
    }

    /// Bound → Armed: expose the device and install the edge handler.
    /// On failure the endpoint stays Bound.
    pub fn arm(&mut self) -> Result<IrqLine, EndpointError> {
        let line = match self.state {
            EndpointState::Bound(line) => line,
            other => {
                return Err(EndpointError::InvalidTransition {
                    from: other.name(),
                    to: "Armed",
                })
            }
        };

        for stage in [Stage::CharDevice, Stage::DiagnosticEntry, Stage::Irq] {
            self.acquire(stage, Some(line))?;
        }

        self.dispatcher.set_armed(true);
        self.state = EndpointState::Armed(line);
        tracing::debug!(irq = %line, "Interrupt endpoint armed");
        Ok(line)
    }

    /// Release every acquired stage in reverse order and drop the consumer.
    /// Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.dispatcher.set_armed(false);
        let line = self.state.line();

        for stage in [
            Stage::Irq,
            Stage::DiagnosticEntry,
            Stage::CharDevice,
            Stage::Driver,
        ] {
            let held = self.stages.flag(stage);
            if *held {
                *held = false;
                self.platform.release(stage, line);
                tracing::debug!(stage = %stage, "Released endpoint stage");
            }
        }

        if self.dispatcher.deregister_consumer().is_some() {
            tracing::debug!("Dropped registered consumer");
        }
        self.state = EndpointState::Unbound;
    }

    pub fn state(&self) -> EndpointState {
        self.state
    }

    /// Handle to the installed edge handler.
    pub fn dispatcher(&self) -> Arc<EdgeDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn edge_count(&self) -> u64 {
        self.dispatcher.edge_count()
    }

    /// Register the single consumer, replacing any previous one.
    pub fn register_consumer(&self, consumer: Arc<dyn EventSink>) {
        self.dispatcher.register_consumer(consumer);
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn acquire(&mut self, stage: Stage, line: Option<IrqLine>) -> Result<(), EndpointError> {
        if *self.stages.flag(stage) {
            return Ok(());
        }
        self.platform.acquire(stage, line, &self.dispatcher)?;
        *self.stages.flag(stage) = true;
        Ok(())
    }
}

impl<P: IrqPlatform> Drop for InterruptEndpoint<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{PlatformCall, SimulatedPlatform};

    #[test]
    fn test_load_reaches_armed() {
        let endpoint = InterruptEndpoint::load(SimulatedPlatform::new(IrqLine::new(164))).unwrap();
        assert_eq!(endpoint.state(), EndpointState::Armed(IrqLine::new(164)));
        assert!(endpoint.dispatcher().is_armed());
    }

    #[test]
    fn test_arm_requires_bound() {
        let mut endpoint = InterruptEndpoint::new(SimulatedPlatform::new(IrqLine::new(1)));
        let err = endpoint.arm().err().unwrap();
        assert!(matches!(
            err,
            EndpointError::InvalidTransition { from: "Unbound", .. }
        ));
    }

    #[test]
    fn test_failed_arm_stays_bound() {
        let platform = SimulatedPlatform::new(IrqLine::new(7)).failing_at(Stage::Irq);
        let mut endpoint = InterruptEndpoint::new(platform);
        endpoint.bind().unwrap();

        assert!(endpoint.arm().is_err());
        assert_eq!(endpoint.state(), EndpointState::Bound(IrqLine::new(7)));
        assert!(!endpoint.dispatcher().is_armed());
    }

    #[test]
    fn test_teardown_reverse_order_and_idempotent() {
        let platform = SimulatedPlatform::new(IrqLine::new(164));
        let journal = platform.journal();
        let mut endpoint = InterruptEndpoint::load(platform).unwrap();

        endpoint.teardown();
        endpoint.teardown();

        let calls = journal.lock().unwrap().clone();
        let releases: Vec<Stage> = calls
            .iter()
            .filter_map(|c| match c {
                PlatformCall::Release(stage) => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            releases,
            vec![
                Stage::Irq,
                Stage::DiagnosticEntry,
                Stage::CharDevice,
                Stage::Driver
            ]
        );
        assert_eq!(endpoint.state(), EndpointState::Unbound);
    }

    #[test]
    fn test_partial_load_unwinds_only_acquired() {
        let platform = SimulatedPlatform::new(IrqLine::new(3)).failing_at(Stage::DiagnosticEntry);
        let journal = platform.journal();

        assert!(InterruptEndpoint::load(platform).is_err());

        let calls = journal.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                PlatformCall::Acquire(Stage::Driver),
                PlatformCall::Probe,
                PlatformCall::Acquire(Stage::CharDevice),
                PlatformCall::Release(Stage::CharDevice),
                PlatformCall::Release(Stage::Driver),
            ]
        );
    }

    #[test]
    fn test_teardown_drops_consumer() {
        use crate::notify::EventSlot;

        let mut endpoint = InterruptEndpoint::load(SimulatedPlatform::new(IrqLine::new(9))).unwrap();
        let slot = Arc::new(EventSlot::new());
        endpoint.register_consumer(slot.clone());
        endpoint.teardown();

        assert!(!endpoint.dispatcher().has_consumer());
        endpoint.dispatcher().handle_edge();
        assert!(!slot.is_pending());
    }
}
