// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Register Access Layer.
//!
//! Masked read-modify-write access to 32-bit memory-mapped GPIO registers
//! through a physical memory device such as `/dev/mem`.

mod handle;

pub use handle::RegisterHandle;

use crate::error::RegisterError;
use crate::types::{PinIndex, RegisterAddress};

/// Anything that can drive a single bit of a GPIO data register.
///
/// Implementations assume they are the only writer of the target bit for the
/// duration of a run; the read-modify-write is not atomic against external
/// writers of the same register.
pub trait PinDriver {
    /// Set (`value == true`) or clear one bit, leaving every other bit intact.
    fn set_bit(
        &mut self,
        address: RegisterAddress,
        pin: PinIndex,
        value: bool,
    ) -> Result<(), RegisterError>;
}

/// Compute the new register word after setting or clearing `pin`.
pub fn apply_bit(word: u32, pin: PinIndex, value: bool) -> u32 {
    if value {
        word | pin.mask()
    } else {
        word & !pin.mask()
    }
}
