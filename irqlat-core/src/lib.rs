//! irqlat Core Library
//!
//! Measures the round trip from asserting a GPIO output pin to being
//! notified that the paired input raised an interrupt. Provides register
//! access over a physical memory window, the interrupt endpoint and its
//! coalescing notification channel, the sampling loop, and latency statistics.

pub mod clock;
pub mod config;
pub mod error;
pub mod irq;
pub mod mmio;
pub mod notify;
pub mod report;
pub mod sampler;
pub mod session;
pub mod sim;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, MonotonicClock, Timestamp};
pub use config::{Config, ConfigLoader, MeasurementConfig};
pub use error::{HardValidationError, IrqLatError, IrqLatResult};
pub use irq::{EndpointState, InterruptEndpoint};
pub use mmio::{PinDriver, RegisterHandle};
pub use notify::{EventSlot, RunControl};
pub use report::{ResultLog, SeriesReport};
pub use sampler::{Sampler, Series, Trial, WaitPolicy};
pub use session::{HardwareContext, RunSummary, SeriesRunner, SimulatedContext};
pub use stats::{summarize, LatencyStats};
pub use types::{IrqLine, PinIndex, RegisterAddress};
