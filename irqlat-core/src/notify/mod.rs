// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Notification Channel.
//!
//! Delivers "an edge happened" from the interrupt source to the sampling
//! loop as a single coalescing token, either in-process or through SIGIO.

mod device;
mod signals;
mod slot;

pub use device::AsyncDevice;
pub use signals::SignalRouter;
pub use slot::{ClockedSink, EventSlot, RunControl};
