// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Round-trip sampling loop.
//!
//! Each trial asserts the output pin, spins until the edge notification
//! arrives, and records the interval between the assert and the moment the
//! notification was stamped.
//!
//! The pending flag is cleared *before* the pin is asserted. If a stray edge
//! lands between that clear and the assert, it satisfies the wait and the
//! trial reports a short interval. Only one edge is expected per trial, so
//! the window is left open.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, Timestamp};
use crate::error::SamplerError;
use crate::mmio::PinDriver;
use crate::notify::{EventSlot, RunControl};
use crate::types::{PinIndex, RegisterAddress};

/// One measurement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    /// Position within its series, starting at 0.
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    /// `end - start` in whole microseconds.
    pub interval_us: u64,
}

impl Trial {
    pub fn new(index: usize, start: Timestamp, end: Timestamp) -> Self {
        Self {
            index,
            start,
            end,
            interval_us: end.micros_since(start),
        }
    }

    /// A trial known only by its interval.
    pub fn from_interval(index: usize, interval_us: u64) -> Self {
        Self::new(
            index,
            Timestamp::from_nanos(0),
            Timestamp::from_nanos(interval_us.saturating_mul(1_000)),
        )
    }
}

/// How long a trial may wait for its notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Spin until the edge arrives, however long that takes.
    #[default]
    Unbounded,
    /// Give up after this long and fail the trial.
    Deadline(Duration),
}

/// Result of a series.
#[derive(Debug, Clone, Default)]
pub struct Series {
    /// Trials in the order they ran.
    pub trials: Vec<Trial>,
    /// False if a stop request ended the series early.
    pub completed: bool,
}

/// Drives one output pin and measures notification round trips.
pub struct Sampler<'a, D: PinDriver, C: Clock> {
    driver: &'a mut D,
    slot: &'a EventSlot,
    clock: &'a C,
    control: &'a RunControl,
    address: RegisterAddress,
    pin: PinIndex,
    wait: WaitPolicy,
}

impl<'a, D: PinDriver, C: Clock> Sampler<'a, D, C> {
    pub fn new(
        driver: &'a mut D,
        slot: &'a EventSlot,
        clock: &'a C,
        control: &'a RunControl,
        address: RegisterAddress,
        pin: PinIndex,
    ) -> Self {
        Self {
            driver,
            slot,
            clock,
            control,
            address,
            pin,
            wait: WaitPolicy::Unbounded,
        }
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Drive the output pin low.
    pub fn idle_pin(&mut self) -> Result<(), SamplerError> {
        self.driver
            .set_bit(self.address, self.pin, false)
            .map_err(|source| SamplerError::Register { trial: 0, source })
    }

    /// Run a single trial.
    pub fn run_latency_trial(&mut self, index: usize) -> Result<Trial, SamplerError> {
        self.slot.clear();

        let start = self.clock.now();
        self.set_pin(index, true)?;

        let end = match self.wait_for_event(index) {
            Ok(end) => end,
            Err(e) => {
                // Leave the line low; the timeout is what gets reported.
                if let Err(deassert) = self.driver.set_bit(self.address, self.pin, false) {
                    tracing::warn!(
                        trial = index,
                        register = %self.address,
                        pin = self.pin.value(),
                        error = %deassert,
                        "Failed to deassert pin after timeout"
                    );
                }
                return Err(e);
            }
        };

        self.set_pin(index, false)?;

        let trial = Trial::new(index, start, end);
        self.slot.clear();
        Ok(trial)
    }

    /// Run up to `count` trials, stopping early if a stop is requested.
    /// The first failing trial aborts the series.
    pub fn run_series(&mut self, count: usize) -> Result<Series, SamplerError> {
        let mut series = Series {
            trials: Vec::with_capacity(count),
            completed: true,
        };

        for index in 0..count {
            if !self.control.is_running() {
                series.completed = false;
                break;
            }
            series.trials.push(self.run_latency_trial(index)?);
        }

        Ok(series)
    }

    fn set_pin(&mut self, trial: usize, value: bool) -> Result<(), SamplerError> {
        self.driver
            .set_bit(self.address, self.pin, value)
            .map_err(|source| SamplerError::Register { trial, source })
    }

    fn wait_for_event(&self, trial: usize) -> Result<Timestamp, SamplerError> {
        match self.wait {
            WaitPolicy::Unbounded => loop {
                if let Some(at) = self.slot.take() {
                    return Ok(at);
                }
                std::hint::spin_loop();
            },
            WaitPolicy::Deadline(limit) => {
                let waiting_since = Instant::now();
                loop {
                    if let Some(at) = self.slot.take() {
                        return Ok(at);
                    }
                    if waiting_since.elapsed() >= limit {
                        return Err(SamplerError::WaitTimedOut {
                            trial,
                            waited_ms: limit.as_millis() as u64,
                        });
                    }
                    std::hint::spin_loop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::RegisterError;

    /// Pin that posts to the slot on every rising write, `delay_us` later.
    struct EchoPin<'a> {
        slot: &'a EventSlot,
        clock: &'a ManualClock,
        delay_us: u64,
        word: u32,
        fail_on_write: Option<usize>,
        writes: usize,
    }

    impl PinDriver for EchoPin<'_> {
        fn set_bit(
            &mut self,
            address: RegisterAddress,
            pin: PinIndex,
            value: bool,
        ) -> Result<(), RegisterError> {
            self.writes += 1;
            if self.fail_on_write == Some(self.writes) {
                return Err(RegisterError::WriteFailed {
                    address,
                    pin,
                    reason: "injected".to_string(),
                });
            }
            self.word = crate::mmio::apply_bit(self.word, pin, value);
            if value {
                let at = self.clock.advance(Duration::from_micros(self.delay_us));
                self.slot.post(at);
            }
            Ok(())
        }
    }

    fn target() -> (RegisterAddress, PinIndex) {
        (
            RegisterAddress::new(0x43C1_0000).unwrap(),
            PinIndex::new(0).unwrap(),
        )
    }

    #[test]
    fn test_trial_measures_delay() {
        let slot = EventSlot::new();
        let clock = ManualClock::new();
        let control = RunControl::new();
        let mut pin = EchoPin {
            slot: &slot,
            clock: &clock,
            delay_us: 17,
            word: 0,
            fail_on_write: None,
            writes: 0,
        };
        let (address, index) = target();

        let mut sampler = Sampler::new(&mut pin, &slot, &clock, &control, address, index);
        let trial = sampler.run_latency_trial(0).unwrap();
        assert_eq!(trial.interval_us, 17);
        assert!(!slot.is_pending());
        assert_eq!(pin.word, 0);
    }

    #[test]
    fn test_series_preserves_order() {
        let slot = EventSlot::new();
        let clock = ManualClock::new();
        let control = RunControl::new();
        let mut pin = EchoPin {
            slot: &slot,
            clock: &clock,
            delay_us: 5,
            word: 0,
            fail_on_write: None,
            writes: 0,
        };
        let (address, index) = target();

        let series = Sampler::new(&mut pin, &slot, &clock, &control, address, index)
            .run_series(4)
            .unwrap();
        assert!(series.completed);
        let indices: Vec<usize> = series.trials.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(series.trials.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn test_write_failure_aborts_series() {
        let slot = EventSlot::new();
        let clock = ManualClock::new();
        let control = RunControl::new();
        // Write 3 is the assert of the second trial.
        let mut pin = EchoPin {
            slot: &slot,
            clock: &clock,
            delay_us: 5,
            word: 0,
            fail_on_write: Some(3),
            writes: 0,
        };
        let (address, index) = target();

        let err = Sampler::new(&mut pin, &slot, &clock, &control, address, index)
            .run_series(10)
            .err()
            .unwrap();
        assert!(matches!(err, SamplerError::Register { trial: 1, .. }));
    }

    #[test]
    fn test_stop_request_honored_between_trials() {
        let slot = EventSlot::new();
        let clock = ManualClock::new();
        let control = RunControl::new();
        control.stop();
        let mut pin = EchoPin {
            slot: &slot,
            clock: &clock,
            delay_us: 5,
            word: 0,
            fail_on_write: None,
            writes: 0,
        };
        let (address, index) = target();

        let series = Sampler::new(&mut pin, &slot, &clock, &control, address, index)
            .run_series(10)
            .unwrap();
        assert!(!series.completed);
        assert!(series.trials.is_empty());
    }

    #[test]
    fn test_deadline_bounds_missing_interrupt() {
        let slot = EventSlot::new();
        let other_slot = EventSlot::new();
        let clock = ManualClock::new();
        let control = RunControl::new();
        // Posts go to a slot the sampler is not watching.
        let mut pin = EchoPin {
            slot: &other_slot,
            clock: &clock,
            delay_us: 5,
            word: 0,
            fail_on_write: None,
            writes: 0,
        };
        let (address, index) = target();

        let err = Sampler::new(&mut pin, &slot, &clock, &control, address, index)
            .with_wait_policy(WaitPolicy::Deadline(Duration::from_millis(20)))
            .run_latency_trial(0)
            .err()
            .unwrap();
        assert!(matches!(err, SamplerError::WaitTimedOut { trial: 0, .. }));
        assert_eq!(pin.word, 0);
    }

    #[test]
    fn test_timeout_reported_when_deassert_fails() {
        let slot = EventSlot::new();
        let other_slot = EventSlot::new();
        let clock = ManualClock::new();
        let control = RunControl::new();
        // Write 1 asserts, write 2 is the cleanup deassert and fails.
        let mut pin = EchoPin {
            slot: &other_slot,
            clock: &clock,
            delay_us: 5,
            word: 0,
            fail_on_write: Some(2),
            writes: 0,
        };
        let (address, index) = target();

        let err = Sampler::new(&mut pin, &slot, &clock, &control, address, index)
            .with_wait_policy(WaitPolicy::Deadline(Duration::from_millis(5)))
            .run_latency_trial(0)
            .err()
            .unwrap();
        assert!(matches!(err, SamplerError::WaitTimedOut { trial: 0, .. }));
        assert_eq!(pin.writes, 2);
        assert_eq!(pin.word, index.mask());
    }

    #[test]
    fn test_trial_from_huge_interval_saturates() {
        let trial = Trial::from_interval(0, u64::MAX);
        assert_eq!(trial.end.as_nanos(), u64::MAX);
        assert_eq!(trial.interval_us, u64::MAX / 1_000);
    }
}
