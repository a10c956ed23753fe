// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Timestamp sources for trial measurement.
//!
//! `MonotonicClock` reads `CLOCK_MONOTONIC` directly through `clock_gettime`,
//! which is async-signal-safe and can therefore be called from the SIGIO
//! handler. `ManualClock` is advanced explicitly by simulated hardware.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use nix::time::{clock_gettime, ClockId};
use serde::{Deserialize, Serialize};

/// A point in time, in nanoseconds since an unspecified clock origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Whole microseconds elapsed from `earlier` to `self`.
    /// Saturates at zero if `earlier` is later than `self`.
    pub fn micros_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0) / 1_000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Source of trial timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// `CLOCK_MONOTONIC` clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Read the monotonic clock. Safe to call from a signal handler.
    pub fn read() -> Timestamp {
        match clock_gettime(ClockId::CLOCK_MONOTONIC) {
            Ok(ts) => {
                Timestamp(ts.tv_sec() as u64 * 1_000_000_000 + ts.tv_nsec() as u64)
            }
            Err(_) => Timestamp(0),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Self::read()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(origin: Timestamp) -> Self {
        Self {
            nanos: AtomicU64::new(origin.as_nanos()),
        }
    }

    /// Move the clock forward and return the new reading.
    pub fn advance(&self, by: Duration) -> Timestamp {
        let delta = by.as_nanos() as u64;
        Timestamp(self.nanos.fetch_add(delta, Ordering::AcqRel) + delta)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.nanos.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let a = MonotonicClock::read();
        let b = MonotonicClock::read();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::starting_at(Timestamp::from_nanos(500));
        assert_eq!(clock.now().as_nanos(), 500);
        let t = clock.advance(Duration::from_micros(12));
        assert_eq!(t.as_nanos(), 12_500);
        assert_eq!(clock.now(), t);
    }

    #[test]
    fn test_micros_since_truncates_and_saturates() {
        let start = Timestamp::from_nanos(1_000);
        let end = Timestamp::from_nanos(10_999);
        assert_eq!(end.micros_since(start), 9);
        assert_eq!(start.micros_since(end), 0);
    }
}
