//! Storage slot arithmetic for Solidity dynamic arrays.
//!
//! A dynamic array declared at slot `p` keeps its length in `p` itself and its
//! elements contiguously from `keccak256(p)`, where `p` is hashed as a 32-byte
//! big-endian word. Slot numbers live in a 2^256 space and wrap.

use alloy_primitives::U256;
use tiny_keccak::{Hasher, Keccak};

/// keccak256 of the 32-byte big-endian encoding of `declared_slot`.
pub fn dynamic_array_base_slot(declared_slot: U256) -> U256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(&declared_slot.to_be_bytes::<32>());
    hasher.finalize(&mut output);
    U256::from_be_bytes(output)
}

/// Slot of word `word` of element `index`, given the data base slot.
pub fn element_word_slot(base: U256, index: u64, slots_per_element: u32, word: u32) -> U256 {
    let offset = U256::from(index)
        .wrapping_mul(U256::from(slots_per_element))
        .wrapping_add(U256::from(word));
    base.wrapping_add(offset)
}
