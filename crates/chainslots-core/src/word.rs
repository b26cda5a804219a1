//! The raw 32-byte storage word and the bit arithmetic performed on it.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One 32-byte storage word as returned by `eth_getStorageAt`.
///
/// The bytes are kept verbatim; every arithmetic operation goes through the
/// big-endian `U256` interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StorageWord(pub B256);

impl StorageWord {
    pub const ZERO: Self = Self(B256::ZERO);

    pub fn from_u256(value: U256) -> Self {
        Self(B256::from(value.to_be_bytes::<32>()))
    }

    pub fn to_u256(self) -> U256 {
        U256::from_be_bytes(self.0 .0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == B256::ZERO
    }

    /// Parse the hex string an RPC node returns for a storage read.
    ///
    /// Accepts the canonical 64-digit form as well as the shortened forms
    /// (`"0x0"`, `"0x1"`) some nodes emit. Returns `None` for non-hex input or
    /// more than 32 bytes.
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() > 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let padded = format!("{digits:0>64}");
        let bytes = hex::decode(padded).ok()?;
        Some(Self(B256::from_slice(&bytes)))
    }

    /// `(word >> offset) & ((1 << width) - 1)`.
    ///
    /// `offset + width` must stay within 256 bits; descriptors are validated
    /// for that before any word is read.
    pub fn extract(self, offset: u16, width: u16) -> U256 {
        let shifted = self.to_u256() >> usize::from(offset);
        shifted & low_mask(width)
    }
}

impl From<U256> for StorageWord {
    fn from(value: U256) -> Self {
        Self::from_u256(value)
    }
}

impl From<B256> for StorageWord {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for StorageWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A mask with the low `width` bits set. `width >= 256` yields all ones.
pub fn low_mask(width: u16) -> U256 {
    if width >= 256 {
        U256::MAX
    } else {
        (U256::from(1u8) << usize::from(width)) - U256::from(1u8)
    }
}

/// Place `value` at `[offset, offset + width)` inside `word`, clearing
/// whatever was there. Used to build fixtures and packed test storage.
pub fn insert_bits(word: U256, value: U256, offset: u16, width: u16) -> U256 {
    let mask = low_mask(width) << usize::from(offset);
    let placed = (value & low_mask(width)) << usize::from(offset);
    (word & !mask) | placed
}
