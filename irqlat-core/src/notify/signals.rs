// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Routing of process signals into the measurement context.
//!
//! SIGIO means "edge occurred" and posts to the edge slot with a
//! `CLOCK_MONOTONIC` stamp taken inside the handler. SIGINT and SIGHUP clear
//! the keep-running flag. The handlers only touch atomics.
//!
//! The slot and flag are process-wide because signal dispositions are. They
//! are only reachable through the `SignalRouter` guard, and only one router
//! can be installed at a time.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::clock::MonotonicClock;
use crate::error::NotifyError;
use crate::notify::{EventSlot, RunControl};

static EDGE_SLOT: EventSlot = EventSlot::new();

static RUN_CONTROL: RunControl = RunControl::new();

static INSTALLED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_edge_signal(_signo: libc::c_int) {
    EDGE_SLOT.post(MonotonicClock::read());
}

extern "C" fn on_stop_signal(_signo: libc::c_int) {
    RUN_CONTROL.stop();
}

/// Installed signal handlers. Restores the previous dispositions on drop.
pub struct SignalRouter {
    previous: Vec<(Signal, SigAction)>,
}

impl SignalRouter {
    /// Install SIGIO, SIGINT and SIGHUP handlers.
    ///
    /// # Errors
    /// Returns `NotifyError::HandlerInstall` if a router is already installed
    /// or `sigaction` fails.
    pub fn install() -> Result<Self, NotifyError> {
        if INSTALLED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(NotifyError::HandlerInstall {
                signal: "SIGIO",
                reason: "A signal router is already installed".to_string(),
            });
        }

        EDGE_SLOT.clear();
        RUN_CONTROL.resume();

        let mut router = Self {
            previous: Vec::with_capacity(3),
        };

        router.route(Signal::SIGIO, on_edge_signal)?;
        router.route(Signal::SIGINT, on_stop_signal)?;
        router.route(Signal::SIGHUP, on_stop_signal)?;

        tracing::debug!("Installed SIGIO/SIGINT/SIGHUP handlers");
        Ok(router)
    }

    /// Slot posted by SIGIO.
    pub fn edge_slot(&self) -> &'static EventSlot {
        &EDGE_SLOT
    }

    /// Flag cleared by SIGINT/SIGHUP.
    pub fn run_control(&self) -> &'static RunControl {
        &RUN_CONTROL
    }

    fn route(
        &mut self,
        signal: Signal,
        handler: extern "C" fn(libc::c_int),
    ) -> Result<(), NotifyError> {
        // Block everything else while a handler runs; restart interrupted syscalls.
        let action = SigAction::new(
            SigHandler::Handler(handler),
            SaFlags::SA_RESTART,
            SigSet::all(),
        );

        // SAFETY: the handlers only perform async-signal-safe atomic stores
        // and clock_gettime.
        let previous =
            unsafe { sigaction(signal, &action) }.map_err(|e| NotifyError::HandlerInstall {
                signal: signal.as_str(),
                reason: e.to_string(),
            })?;

        self.previous.push((signal, previous));
        Ok(())
    }
}

impl Drop for SignalRouter {
    fn drop(&mut self) {
        for (signal, previous) in self.previous.drain(..).rev() {
            // SAFETY: restoring a disposition that was in place before install.
            if let Err(e) = unsafe { sigaction(signal, &previous) } {
                tracing::error!(signal = signal.as_str(), error = %e, "Failed to restore signal handler");
            }
        }
        INSTALLED.store(false, Ordering::Release);
        tracing::debug!("Restored previous signal handlers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::raise;

    // Signal dispositions are process-wide, so everything lives in one test.
    #[test]
    fn test_signal_routing() {
        let router = SignalRouter::install().unwrap();
        assert!(SignalRouter::install().is_err());

        let slot = router.edge_slot();
        assert!(!slot.is_pending());

        raise(Signal::SIGIO).unwrap();
        raise(Signal::SIGIO).unwrap();
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());

        assert!(router.run_control().is_running());
        raise(Signal::SIGHUP).unwrap();
        assert!(!router.run_control().is_running());

        drop(router);
        let again = SignalRouter::install().unwrap();
        assert!(again.run_control().is_running());
    }
}
