// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Following the "Newtype" pattern in Rust to ensure valid state by construction.
//! All types validate their invariants at creation time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Size of one memory-mapped register window (one page).
pub const PAGE_SIZE: u64 = 4096;

/// Mask selecting the in-page offset of an address.
pub const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// Width of a GPIO data register in bits.
pub const REGISTER_BITS: u32 = 32;

/// Physical address of a 32-bit memory-mapped register.
/// Must be 4-byte aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegisterAddress(u64);

impl RegisterAddress {
    /// Create a new RegisterAddress with validation.
    pub fn new(address: u64) -> Result<Self, HardValidationError> {
        if address % 4 != 0 {
            return Err(HardValidationError::InvalidRegisterAddress {
                value: format!("{:#x}", address),
                reason: "Register address must be 4-byte aligned".to_string(),
            });
        }
        Ok(Self(address))
    }

    /// Parse a hex (`0x...`) or decimal address.
    pub fn parse(text: &str) -> Result<Self, HardValidationError> {
        let trimmed = text.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
            None => trimmed.replace('_', "").parse::<u64>(),
        };

        let address = parsed.map_err(|e| HardValidationError::InvalidRegisterAddress {
            value: text.to_string(),
            reason: e.to_string(),
        })?;

        Self::new(address)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Base address of the page containing this register.
    pub fn page_base(&self) -> u64 {
        self.0 & !PAGE_MASK
    }

    /// Byte offset of this register within its page.
    pub fn page_offset(&self) -> usize {
        (self.0 & PAGE_MASK) as usize
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl TryFrom<String> for RegisterAddress {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegisterAddress> for String {
    fn from(address: RegisterAddress) -> Self {
        address.to_string()
    }
}

/// Bit index of a GPIO pin within its 32-bit data register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PinIndex(u8);

impl PinIndex {
    /// Create a new PinIndex with validation.
    pub fn new(pin: u32) -> Result<Self, HardValidationError> {
        if pin >= REGISTER_BITS {
            return Err(HardValidationError::InvalidPin {
                pin,
                limit: REGISTER_BITS,
            });
        }
        Ok(Self(pin as u8))
    }

    pub fn value(&self) -> u32 {
        self.0 as u32
    }

    /// Single-bit mask selecting this pin.
    pub fn mask(&self) -> u32 {
        1u32 << self.0
    }
}

impl fmt::Display for PinIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for PinIndex {
    type Error = HardValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PinIndex> for u32 {
    fn from(pin: PinIndex) -> Self {
        pin.value()
    }
}

/// Hardware interrupt line number yielded by a platform probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrqLine(u32);

impl IrqLine {
    pub fn new(line: u32) -> Self {
        Self(line)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for IrqLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_address_hex_and_decimal() {
        let hex = RegisterAddress::parse("0x43C10000").unwrap();
        assert_eq!(hex.value(), 0x43C1_0000);

        let dec = RegisterAddress::parse("4096").unwrap();
        assert_eq!(dec.value(), 4096);
    }

    #[test]
    fn test_register_address_alignment() {
        assert!(RegisterAddress::new(0x1002).is_err());
        assert!(RegisterAddress::parse("0x43C10001").is_err());
        assert!(RegisterAddress::parse("not-an-address").is_err());
    }

    #[test]
    fn test_register_address_page_split() {
        let addr = RegisterAddress::new(0x43C1_0ABC).unwrap();
        assert_eq!(addr.page_base(), 0x43C1_0000);
        assert_eq!(addr.page_offset(), 0xABC);
    }

    #[test]
    fn test_pin_index_bounds() {
        assert!(PinIndex::new(0).is_ok());
        assert!(PinIndex::new(31).is_ok());
        assert!(PinIndex::new(32).is_err());
        assert_eq!(PinIndex::new(5).unwrap().mask(), 0b10_0000);
    }
}
