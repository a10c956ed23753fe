// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Interrupt Source.
//!
//! An endpoint bound to one IRQ line that counts rising edges and posts a
//! coalesced notification to at most one registered consumer.

mod dispatch;
mod endpoint;

pub use dispatch::{EdgeDispatcher, EventSink, IrqReturn};
pub use endpoint::{EndpointState, InterruptEndpoint, IrqPlatform, Stage};
