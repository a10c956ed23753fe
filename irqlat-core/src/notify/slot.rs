// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Single-slot coalescing event and the keep-running flag.
//!
//! Both types are plain atomics so they can be touched from a signal handler
//! or interrupt context.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::clock::{Clock, MonotonicClock, Timestamp};
use crate::irq::EventSink;

/// At-most-one-pending notification.
///
/// Posting while an event is already pending collapses into the pending one
/// and keeps the timestamp of the first post. Only the producer side of the
/// slot runs in handler context; there is a single producer per slot.
#[derive(Debug, Default)]
pub struct EventSlot {
    pending: AtomicBool,
    stamp: AtomicU64,
    coalesced: AtomicU64,
}

impl EventSlot {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            stamp: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }

    /// Post an event observed at `at`.
    /// Returns `false` if it coalesced into an event already pending.
    pub fn post(&self, at: Timestamp) -> bool {
        if self.pending.load(Ordering::Acquire) {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.stamp.store(at.as_nanos(), Ordering::Relaxed);
        self.pending.store(true, Ordering::Release);
        true
    }

    /// Consume the pending event, returning when it was observed.
    pub fn take(&self) -> Option<Timestamp> {
        if self.pending.swap(false, Ordering::AcqRel) {
            Some(Timestamp::from_nanos(self.stamp.load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    /// Drop any pending event without reading it.
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Posts that collapsed into an already pending event.
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

/// Stamps with `CLOCK_MONOTONIC`, the same clock the signal handler uses.
impl EventSink for EventSlot {
    fn notify(&self) {
        self.post(MonotonicClock::read());
    }
}

/// Consumer that stamps notifications with a caller-chosen clock.
pub struct ClockedSink<C: Clock> {
    slot: Arc<EventSlot>,
    clock: Arc<C>,
}

impl<C: Clock> ClockedSink<C> {
    pub fn new(slot: Arc<EventSlot>, clock: Arc<C>) -> Self {
        Self { slot, clock }
    }
}

impl<C: Clock> EventSink for ClockedSink<C> {
    fn notify(&self) {
        self.slot.post(self.clock.now());
    }
}

/// Keep-running flag checked between trials.
#[derive(Debug)]
pub struct RunControl {
    running: AtomicBool,
}

impl RunControl {
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Request a graceful stop after the current trial.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::Release);
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}
